use super::{DataProvider, ListParams};
use async_trait::async_trait;
use database::{DatabaseHandle, TokenCall};
use std::sync::Arc;
use utils::{AppConfig, AppResult};

/// 首选数据源：直接查询MongoDB。
/// 连接经由进程级单例惰性建立，未配置连接串时该provider根本不会被装配。
pub struct MongoProvider {
    handle: Arc<DatabaseHandle>,
    config: Arc<AppConfig>,
}

impl MongoProvider {
    pub fn new(handle: Arc<DatabaseHandle>, config: Arc<AppConfig>) -> Self {
        Self { handle, config }
    }
}

#[async_trait]
impl DataProvider for MongoProvider {
    fn name(&self) -> &'static str {
        "mongo"
    }

    async fn fetch_token_calls(&self, params: &ListParams) -> AppResult<Vec<TokenCall>> {
        let db = self.handle.get_or_connect(&self.config).await?;
        match params.since {
            Some(since) => db.token_call_repository.list_since(since, params.limit).await,
            None => db.token_call_repository.list(params.limit).await,
        }
    }

    async fn fetch_users(&self, params: &ListParams) -> AppResult<Vec<serde_json::Value>> {
        let db = self.handle.get_or_connect(&self.config).await?;
        let users = db.user_repository.list(params.limit).await?;
        let values = users
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| utils::AppError::InternalServerErrorWithContext(format!("serialize users: {}", e)))?;
        Ok(values)
    }
}
