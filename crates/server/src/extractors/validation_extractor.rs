use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use utils::AppError;
use validator::Validate;

/// Json反序列化 + validator校验二合一。
/// 请求体不合法统一返回400，不区分是解析失败还是校验失败的具体字段。
pub struct ValidationExtractor<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidationExtractor<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(format!("malformed request body: {}", e)))?;

        value.validate().map_err(|e| AppError::BadRequest(e.to_string()))?;

        Ok(Self(value))
    }
}
