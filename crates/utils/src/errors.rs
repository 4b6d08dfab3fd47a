use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// 统一错误类型。所有数据源失败都在本地捕获并转入下一个数据源，
/// 只有全部来源耗尽时才会通过该类型返回给调用方。
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// 必需的配置缺失（管理员凭证、支付密钥等），拒绝服务而不是使用默认值
    #[error("{0}")]
    ServiceUnavailable(String),

    /// 上游API不可达或返回了非JSON响应体，附带截断后的原始响应预览
    #[error("{message}")]
    BadGateway { message: String, preview: Option<String> },

    /// 支付服务商错误原样透传（消息与状态码）
    #[error("{message}")]
    PaymentProvider { status: u16, message: String },

    #[error("{0}")]
    InternalServerErrorWithContext(String),

    #[error(transparent)]
    MongoError(#[from] mongodb::error::Error),

    #[error(transparent)]
    HttpError(#[from] reqwest::Error),

    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

/// 502响应中原始响应体预览的最大长度
pub const BODY_PREVIEW_LIMIT: usize = 300;

/// 截断上游响应体用于诊断输出
pub fn truncate_body(body: &str) -> String {
    if body.len() <= BODY_PREVIEW_LIMIT {
        return body.to_string();
    }
    let mut end = BODY_PREVIEW_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            AppError::PaymentProvider { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::BadGateway { .. } => "BAD_GATEWAY",
            AppError::PaymentProvider { .. } => "PAYMENT_PROVIDER",
            _ => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let mut body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });

        if let AppError::BadGateway { preview: Some(preview), .. } = &self {
            body["error"]["preview"] = json!(preview);
        }

        tracing::error!("🔴 request failed: {} {}", status.as_u16(), self);

        (status, Json(body)).into_response()
    }
}
