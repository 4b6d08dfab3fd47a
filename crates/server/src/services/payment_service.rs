use crate::dtos::payment_dto::PaymentIntentResponse;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use utils::{truncate_body, AppConfig, AppError, AppResult};

/// Stripe PaymentIntents REST端点
pub const STRIPE_PAYMENT_INTENTS_URL: &str = "https://api.stripe.com/v1/payment_intents";

/// 支付演示流程：对Stripe REST API的薄封装。
/// 服务商返回的错误消息与HTTP状态码原样透传给前端。
pub struct PaymentService {
    client: reqwest::Client,
    secret_key: Option<String>,
    endpoint: String,
}

impl PaymentService {
    pub fn new(config: &Arc<AppConfig>) -> Self {
        Self::with_endpoint(config.stripe_secret_key.clone(), STRIPE_PAYMENT_INTENTS_URL)
    }

    /// endpoint可注入（测试指向本地mock）
    pub fn with_endpoint(secret_key: Option<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            secret_key,
            endpoint: endpoint.into(),
        }
    }

    pub async fn create_payment_intent(&self, amount: i64, currency: &str) -> AppResult<PaymentIntentResponse> {
        let key = self
            .secret_key
            .as_ref()
            .ok_or_else(|| AppError::ServiceUnavailable("payment provider is not configured".to_string()))?;

        let params = [
            ("amount", amount.to_string()),
            ("currency", currency.to_lowercase()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let response = self.client.post(&self.endpoint).bearer_auth(key).form(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let json: Value = serde_json::from_str(&body).map_err(|_| AppError::BadGateway {
            message: "payment provider returned a non-JSON body".to_string(),
            preview: Some(truncate_body(&body)),
        })?;

        if !status.is_success() {
            let message = json
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("payment provider error")
                .to_string();
            return Err(AppError::PaymentProvider {
                status: status.as_u16(),
                message,
            });
        }

        let client_secret = json
            .get("client_secret")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::BadGateway {
                message: "payment provider response missing client_secret".to_string(),
                preview: Some(truncate_body(&body)),
            })?
            .to_string();

        info!("💳 payment intent created ({} {})", amount, currency.to_lowercase());
        Ok(PaymentIntentResponse { client_secret })
    }
}
