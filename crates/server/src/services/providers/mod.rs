pub mod local_file;
pub mod mongo;
pub mod upstream;

pub use local_file::LocalFileProvider;
pub use mongo::MongoProvider;
pub use upstream::{UpstreamClient, UpstreamProvider};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database::{DatabaseHandle, TokenCall};
use std::sync::Arc;
use tracing::{info, warn};
use utils::{AppConfig, AppResult};

/// 列表查询参数（限流后的limit + 可选的增量时间戳）
#[derive(Clone, Copy, Debug, Default)]
pub struct ListParams {
    pub limit: i64,
    pub since: Option<DateTime<Utc>>,
}

/// 统一的数据源抽象。
///
/// 数据库、上游API、本地静态文件各实现一份，解析器按固定顺序
/// 逐个尝试，取代原系统里层层嵌套的try/catch回退。
#[async_trait]
pub trait DataProvider {
    fn name(&self) -> &'static str;

    async fn fetch_token_calls(&self, params: &ListParams) -> AppResult<Vec<TokenCall>>;

    async fn fetch_users(&self, params: &ListParams) -> AppResult<Vec<serde_json::Value>>;
}

pub type DynDataProvider = Arc<dyn DataProvider + Send + Sync>;

/// 有序数据源解析链。
/// 每个数据源的失败只记日志并尝试下一个；全部失败时列表接口
/// 约定降级为空列表，保证看板照常渲染。
pub struct SourceResolver {
    providers: Vec<DynDataProvider>,
}

impl SourceResolver {
    pub fn new(providers: Vec<DynDataProvider>) -> Self {
        Self { providers }
    }

    /// 按配置装配数据源：Mongo（配置了连接串时）→ 上游API → 本地文件（仅非生产且开启）
    pub fn from_config(config: &Arc<AppConfig>, handle: Arc<DatabaseHandle>) -> Self {
        let mut providers: Vec<DynDataProvider> = Vec::new();

        if DatabaseHandle::is_configured(config) {
            providers.push(Arc::new(MongoProvider::new(handle, config.clone())));
        }
        if let Some(client) = UpstreamClient::from_config(config) {
            providers.push(Arc::new(UpstreamProvider::new(Arc::new(client))));
        }
        if config.local_fallback_enabled() {
            providers.push(Arc::new(LocalFileProvider::new(config.local_data_dir.clone())));
        }

        info!("🧭 source resolver chain: {:?}", providers.iter().map(|p| p.name()).collect::<Vec<_>>());
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// 逐个数据源尝试，返回第一个成功结果；全部失败返回空列表
    pub async fn token_calls(&self, params: &ListParams) -> Vec<TokenCall> {
        for provider in &self.providers {
            match provider.fetch_token_calls(params).await {
                Ok(calls) => return calls,
                Err(e) => warn!("⚠️ provider [{}] token_calls failed: {}", provider.name(), e),
            }
        }
        Vec::new()
    }

    pub async fn users(&self, params: &ListParams) -> Vec<serde_json::Value> {
        for provider in &self.providers {
            match provider.fetch_users(params).await {
                Ok(users) => return users,
                Err(e) => warn!("⚠️ provider [{}] users failed: {}", provider.name(), e),
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utils::AppError;

    struct StaticProvider {
        name: &'static str,
        calls: Option<Vec<TokenCall>>,
    }

    #[async_trait]
    impl DataProvider for StaticProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch_token_calls(&self, _params: &ListParams) -> AppResult<Vec<TokenCall>> {
            self.calls
                .clone()
                .ok_or_else(|| AppError::ServiceUnavailable(format!("{} down", self.name)))
        }

        async fn fetch_users(&self, _params: &ListParams) -> AppResult<Vec<serde_json::Value>> {
            Err(AppError::ServiceUnavailable("unused".to_string()))
        }
    }

    fn call_named(group: &str) -> TokenCall {
        TokenCall {
            group_name: Some(group.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_resolver_takes_first_successful_provider() {
        let resolver = SourceResolver::new(vec![
            Arc::new(StaticProvider { name: "a", calls: None }),
            Arc::new(StaticProvider {
                name: "b",
                calls: Some(vec![call_named("from_b")]),
            }),
            Arc::new(StaticProvider {
                name: "c",
                calls: Some(vec![call_named("from_c")]),
            }),
        ]);

        let calls = resolver.token_calls(&ListParams::default()).await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].group_name.as_deref(), Some("from_b"));
    }

    #[tokio::test]
    async fn test_resolver_degrades_to_empty_when_all_fail() {
        let resolver = SourceResolver::new(vec![
            Arc::new(StaticProvider { name: "a", calls: None }),
            Arc::new(StaticProvider { name: "b", calls: None }),
        ]);

        assert!(resolver.token_calls(&ListParams::default()).await.is_empty());
        assert!(resolver.users(&ListParams::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_resolver_with_no_providers_returns_empty() {
        let resolver = SourceResolver::new(vec![]);
        assert!(resolver.token_calls(&ListParams::default()).await.is_empty());
    }
}
