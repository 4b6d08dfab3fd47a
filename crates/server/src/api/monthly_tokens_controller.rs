use crate::{
    dtos::list_dto::{clamp_limit, ListQuery, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT},
    services::Services,
};
use axum::{
    extract::Query,
    routing::{get, Router},
    Extension, Json,
};
use database::{DatabaseHandle, GroupMonthlyTokens};
use tracing::warn;

pub struct MonthlyTokensController;

impl MonthlyTokensController {
    pub fn app() -> Router {
        Router::new().route("/", get(list))
    }
}

/// 群组月度代币汇总
///
/// 该集合只存在于数据库，没有上游回退；未配置数据库或查询失败
/// 都降级为空列表。
#[utoipa::path(
    get,
    path = "/api/rnd/group-monthly-tokens",
    tag = "dashboard",
    params(ListQuery),
    responses(
        (status = 200, description = "月度汇总，最新写入在前")
    )
)]
pub async fn list(
    Extension(services): Extension<Services>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<GroupMonthlyTokens>> {
    if !DatabaseHandle::is_configured(&services.config) {
        return Json(Vec::new());
    }

    let limit = clamp_limit(query.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let result = async {
        let db = services.db.get_or_connect(&services.config).await?;
        db.monthly_tokens_repository.list_newest(limit).await
    }
    .await;

    match result {
        Ok(docs) => Json(docs),
        Err(e) => {
            warn!("⚠️ group-monthly-tokens query failed: {}", e);
            Json(Vec::new())
        }
    }
}
