use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::net::SocketAddr;
use tracing::info;
use utils::AppError;

/// 会话cookie名（不透明标记）
pub const SESSION_COOKIE: &str = "cb_session";
/// 展示名cookie（前端读取，非HttpOnly）
pub const NAME_COOKIE: &str = "cb_name";

/// 请求IP日志中间件（测试环境下没有ConnectInfo，记为"-"）
pub async fn simple_ip_logger(
    addr: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let ip = addr.map(|ConnectInfo(a)| a.ip().to_string()).unwrap_or_else(|| "-".to_string());
    info!("📍 {} | {} {} → {}", ip, method, path, response.status().as_u16());
    response
}

/// 会话守卫：/api/rnd 下的所有接口要求携带非空的会话cookie。
/// cookie本身是不透明标记，服务端不保存会话状态。
pub async fn require_session(jar: CookieJar, request: Request, next: Next) -> Response {
    match jar.get(SESSION_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => next.run(request).await,
        _ => AppError::Unauthorized("login required".to_string()).into_response(),
    }
}
