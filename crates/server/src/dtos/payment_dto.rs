use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct CreatePaymentIntentDto {
    /// 最小货币单位计的金额，下限50（Stripe的最低收款额）
    #[validate(range(min = 50, message = "amount below provider minimum"))]
    pub amount: i64,
    /// ISO 4217三字母货币代码
    #[validate(length(equal = 3, message = "currency must be a 3-letter code"))]
    pub currency: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_amount_below_minimum() {
        let dto = CreatePaymentIntentDto {
            amount: 49,
            currency: "usd".to_string(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_currency_code() {
        let dto = CreatePaymentIntentDto {
            amount: 500,
            currency: "dollars".to_string(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_accepts_valid_payload() {
        let dto = CreatePaymentIntentDto {
            amount: 500,
            currency: "eur".to_string(),
        };
        assert!(dto.validate().is_ok());
    }
}
