use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct LoginDto {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct LoginResponse {
    pub ok: bool,
    /// 展示名（取邮箱@前的部分）
    pub name: String,
}
