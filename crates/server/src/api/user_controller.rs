use crate::{
    dtos::list_dto::{clamp_limit, ListQuery, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT},
    services::{providers::ListParams, Services},
};
use axum::{
    extract::Query,
    routing::{get, Router},
    Extension, Json,
};

pub struct UserController;

impl UserController {
    pub fn app() -> Router {
        Router::new().route("/", get(list))
    }
}

/// 用户列表
///
/// 与喊单列表同一套数据源解析链，全部失败时返回空列表
#[utoipa::path(
    get,
    path = "/api/rnd/users",
    tag = "dashboard",
    params(ListQuery),
    responses(
        (status = 200, description = "用户记录，最新在前")
    )
)]
pub async fn list(
    Extension(services): Extension<Services>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<serde_json::Value>> {
    let params = ListParams {
        limit: clamp_limit(query.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT),
        since: None,
    };
    Json(services.resolver.users(&params).await)
}
