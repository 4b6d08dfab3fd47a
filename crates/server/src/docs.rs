use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Callboard Admin Backend API",
        description = "基于 Rust 和 Axum 的喊单看板管理后台 API 文档",
        version = "1.0.0"
    ),
    paths(
        // System health check
        crate::api::health,
        // Auth endpoints
        crate::api::auth_controller::login,
        crate::api::auth_controller::logout,
        // Dashboard endpoints
        crate::api::stats_controller::stats,
        crate::api::token_call_controller::list,
        crate::api::token_call_controller::latest,
        crate::api::token_call_controller::stream,
        crate::api::user_controller::list,
        crate::api::monthly_tokens_controller::list,
        // Diagnostics
        crate::api::debug_controller::env_status,
        crate::api::debug_controller::mongo_status,
        // Payments
        crate::api::payment_controller::create_payment_intent,
    ),
    components(
        schemas(
            // DTOs
            crate::dtos::auth_dto::LoginDto,
            crate::dtos::auth_dto::LoginResponse,
            crate::dtos::stats_dto::WindowDelta,
            crate::dtos::stats_dto::StatsSnapshot,
            crate::dtos::payment_dto::CreatePaymentIntentDto,
            crate::dtos::payment_dto::PaymentIntentResponse,
        )
    ),
    tags(
        (name = "系统状态", description = "健康检查"),
        (name = "authentication", description = "管理员登录与会话"),
        (name = "dashboard", description = "看板数据（统计、喊单、用户）"),
        (name = "diagnostics", description = "配置与连通性诊断"),
        (name = "payments", description = "支付演示")
    )
)]
pub struct ApiDoc;
