use std::sync::Arc;
use utils::{AppConfig, AppError, AppResult};
use uuid::Uuid;

pub type DynAuthService = Arc<dyn AuthServiceTrait + Send + Sync>;

/// 登录成功后签发的会话信息
#[derive(Clone, Debug)]
pub struct SessionIssue {
    /// 不透明的会话标记（写入HttpOnly cookie）
    pub session_token: String,
    /// 展示名，取邮箱@前的部分
    pub display_name: String,
}

pub trait AuthServiceTrait {
    fn verify(&self, email: &str, password: &str) -> AppResult<SessionIssue>;
}

/// 静态凭证校验。
/// 凭证必须通过环境变量显式配置；缺失时直接拒绝服务（fail closed），
/// 不存在任何内置的默认账号。
pub struct EnvAuthService {
    config: Arc<AppConfig>,
}

impl EnvAuthService {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }
}

impl AuthServiceTrait for EnvAuthService {
    fn verify(&self, email: &str, password: &str) -> AppResult<SessionIssue> {
        let (expected_email, expected_password) = match (&self.config.admin_email, &self.config.admin_password) {
            (Some(e), Some(p)) => (e, p),
            _ => {
                return Err(AppError::ServiceUnavailable(
                    "admin credentials are not configured".to_string(),
                ))
            }
        };

        // 错误信息不区分是哪个字段不匹配
        if !email.eq_ignore_ascii_case(expected_email) || password != expected_password {
            return Err(AppError::Unauthorized("invalid credentials".to_string()));
        }

        let display_name = email.split('@').next().unwrap_or(email).to_string();
        Ok(SessionIssue {
            session_token: Uuid::new_v4().to_string(),
            display_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with_creds(email: Option<&str>, password: Option<&str>) -> EnvAuthService {
        let mut config = AppConfig::new_for_test();
        config.admin_email = email.map(str::to_string);
        config.admin_password = password.map(str::to_string);
        EnvAuthService::new(Arc::new(config))
    }

    #[test]
    fn test_verify_accepts_configured_credentials() {
        let svc = service_with_creds(Some("admin@example.com"), Some("hunter2"));
        let issue = svc.verify("Admin@Example.com", "hunter2").unwrap();
        assert_eq!(issue.display_name, "Admin");
        assert!(!issue.session_token.is_empty());
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        let svc = service_with_creds(Some("admin@example.com"), Some("hunter2"));
        let err = svc.verify("admin@example.com", "wrong").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_verify_fails_closed_without_configuration() {
        let svc = service_with_creds(None, None);
        let err = svc.verify("admin@example.com", "anything").unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));

        let svc = service_with_creds(Some("admin@example.com"), None);
        let err = svc.verify("admin@example.com", "anything").unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));
    }
}
