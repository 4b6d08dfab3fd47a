use crate::{dtos::stats_dto::StatsSnapshot, services::Services};
use axum::{
    routing::{get, Router},
    Extension, Json,
};
use utils::AppResult;

pub struct StatsController;

impl StatsController {
    pub fn app() -> Router {
        Router::new().route("/", get(stats))
    }
}

/// 看板统计
///
/// 数据库可用时并发聚合各项计数；否则透传上游API的统计JSON。
/// 两者都不可用时返回500；上游返回非JSON时返回502并附响应体预览。
#[utoipa::path(
    get,
    path = "/api/rnd/stats",
    tag = "dashboard",
    responses(
        (status = 200, description = "统计快照", body = StatsSnapshot),
        (status = 500, description = "没有可用的统计数据源"),
        (status = 502, description = "上游返回了非JSON响应")
    )
)]
pub async fn stats(Extension(services): Extension<Services>) -> AppResult<Json<serde_json::Value>> {
    let snapshot = services.stats.snapshot().await?;
    Ok(Json(snapshot))
}
