use crate::{
    dtos::list_dto::{
        clamp_limit, parse_since, LatestResponse, ListQuery, SinceQuery, DEFAULT_LATEST_LIMIT, DEFAULT_LIST_LIMIT,
        DEFAULT_STREAM_LIMIT, MAX_LATEST_LIMIT, MAX_LIST_LIMIT, MAX_STREAM_LIMIT,
    },
    services::{
        providers::ListParams,
        stream_service::StreamLimits,
        Services,
    },
};
use axum::{
    extract::Query,
    response::IntoResponse,
    routing::{get, Router},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use database::TokenCall;
use utils::{AppError, AppResult};

pub struct TokenCallController;

impl TokenCallController {
    pub fn app() -> Router {
        Router::new()
            .route("/", get(list))
            .route("/latest", get(latest))
            .route("/stream", get(stream))
    }
}

/// since参数非法时报400而不是静默忽略
fn parse_since_param(raw: &Option<String>) -> AppResult<Option<DateTime<Utc>>> {
    match raw {
        None => Ok(None),
        Some(s) => parse_since(s)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("invalid since parameter: {}", s))),
    }
}

/// 喊单记录列表
///
/// 数据源按 数据库 → 上游API → 本地文件 的顺序解析，
/// 全部失败时降级为空列表（保持看板可渲染）。
#[utoipa::path(
    get,
    path = "/api/rnd/token-calls",
    tag = "dashboard",
    params(ListQuery),
    responses(
        (status = 200, description = "喊单记录，最新在前")
    )
)]
pub async fn list(
    Extension(services): Extension<Services>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<TokenCall>> {
    let params = ListParams {
        limit: clamp_limit(query.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT),
        since: None,
    };
    Json(services.resolver.token_calls(&params).await)
}

/// 增量拉取最新喊单
#[utoipa::path(
    get,
    path = "/api/rnd/token-calls/latest",
    tag = "dashboard",
    params(SinceQuery),
    responses(
        (status = 200, description = "since之后的新记录，包装为 {data, timestamp, count}"),
        (status = 400, description = "since参数无法解析")
    )
)]
pub async fn latest(
    Extension(services): Extension<Services>,
    Query(query): Query<SinceQuery>,
) -> AppResult<Json<LatestResponse<TokenCall>>> {
    let params = ListParams {
        limit: clamp_limit(query.limit, DEFAULT_LATEST_LIMIT, MAX_LATEST_LIMIT),
        since: parse_since_param(&query.since)?,
    };
    let calls = services.resolver.token_calls(&params).await;
    Ok(Json(LatestResponse::new(calls)))
}

/// SSE实时推送
///
/// 立即拉取一次，之后每3秒轮询；新记录逐条推送，空转tick发心跳帧。
/// 达到最大消息数或墙钟上限后连接自行关闭，重连与断点由客户端
/// 通过since参数自理。
#[utoipa::path(
    get,
    path = "/api/rnd/token-calls/stream",
    tag = "dashboard",
    params(SinceQuery),
    responses(
        (status = 200, description = "text/event-stream，事件类型: token_call | heartbeat | done"),
        (status = 400, description = "since参数无法解析")
    )
)]
pub async fn stream(
    Extension(services): Extension<Services>,
    Query(query): Query<SinceQuery>,
) -> AppResult<impl IntoResponse> {
    let params = ListParams {
        limit: clamp_limit(query.limit, DEFAULT_STREAM_LIMIT, MAX_STREAM_LIMIT),
        since: parse_since_param(&query.since)?,
    };
    Ok(services.stream.open(params, StreamLimits::default()))
}
