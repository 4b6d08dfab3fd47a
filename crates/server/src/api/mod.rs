pub mod auth_controller;
pub mod debug_controller;
pub mod monthly_tokens_controller;
pub mod payment_controller;
pub mod stats_controller;
pub mod token_call_controller;
pub mod user_controller;

use axum::routing::{get, Router};

/// 系统健康检查
///
/// 返回服务器运行状态
#[utoipa::path(
    get,
    path = "/api/",
    responses(
        (status = 200, description = "服务器运行正常", body = String)
    ),
    tag = "系统状态"
)]
pub async fn health() -> &'static str {
    "Server is running! 🚀"
}

/// /api/rnd 下的看板数据接口（整体挂在会话守卫后面）
pub fn rnd_app() -> Router {
    Router::new()
        .nest("/stats", stats_controller::StatsController::app())
        .nest("/token-calls", token_call_controller::TokenCallController::app())
        .nest("/users", user_controller::UserController::app())
        .nest(
            "/group-monthly-tokens",
            monthly_tokens_controller::MonthlyTokensController::app(),
        )
        .nest("/debug", debug_controller::DebugController::app())
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(health))
        .nest("/auth", auth_controller::AuthController::app())
        .nest("/stripe", payment_controller::PaymentController::app())
}
