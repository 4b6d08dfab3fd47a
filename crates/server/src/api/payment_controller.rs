use crate::{
    dtos::payment_dto::{CreatePaymentIntentDto, PaymentIntentResponse},
    extractors::ValidationExtractor,
    services::Services,
};
use axum::{
    routing::{post, Router},
    Extension, Json,
};
use utils::AppResult;

/// 支付演示控制器（与看板数据无关的独立流程）
pub struct PaymentController;

impl PaymentController {
    pub fn app() -> Router {
        Router::new().route("/create-payment-intent", post(create_payment_intent))
    }
}

/// 创建支付意向
///
/// 金额下限与货币格式在本地校验，其余错误由支付服务商返回并原样透传
#[utoipa::path(
    post,
    path = "/api/stripe/create-payment-intent",
    tag = "payments",
    request_body = CreatePaymentIntentDto,
    responses(
        (status = 200, description = "返回client_secret", body = PaymentIntentResponse),
        (status = 400, description = "金额低于下限或货币代码非法"),
        (status = 503, description = "支付密钥未配置")
    )
)]
pub async fn create_payment_intent(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<CreatePaymentIntentDto>,
) -> AppResult<Json<PaymentIntentResponse>> {
    let intent = services.payment.create_payment_intent(req.amount, &req.currency).await?;
    Ok(Json(intent))
}
