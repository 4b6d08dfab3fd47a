use super::{DataProvider, ListParams};
use async_trait::async_trait;
use database::TokenCall;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;
use utils::{AppError, AppResult};

/// 兜底数据源：本地静态JSON文件。
/// 仅在非生产环境且显式开启时装配，用于离线开发时让看板有数据可渲染。
pub struct LocalFileProvider {
    dir: PathBuf,
}

impl LocalFileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read_json(&self, file: &str) -> AppResult<Value> {
        let path = self.dir.join(file);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::NotFound(format!("local data file {:?}: {}", path, e)))?;
        let json = serde_json::from_str(&raw)
            .map_err(|e| AppError::InternalServerErrorWithContext(format!("invalid json in {:?}: {}", path, e)))?;
        debug!("📄 loaded local fallback file {:?}", path);
        Ok(json)
    }

    /// 全量读取（统计聚合用，不做since/limit裁剪）
    pub async fn all_token_calls(&self) -> AppResult<Vec<TokenCall>> {
        match self.read_json("token_calls.json").await? {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect()),
            _ => Err(AppError::InternalServerErrorWithContext(
                "token_calls.json must contain an array".to_string(),
            )),
        }
    }

    pub async fn all_users(&self) -> AppResult<Vec<Value>> {
        match self.read_json("users.json").await? {
            Value::Array(items) => Ok(items),
            _ => Err(AppError::InternalServerErrorWithContext(
                "users.json must contain an array".to_string(),
            )),
        }
    }
}

#[async_trait]
impl DataProvider for LocalFileProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn fetch_token_calls(&self, params: &ListParams) -> AppResult<Vec<TokenCall>> {
        let mut calls = self.all_token_calls().await?;

        if let Some(since) = params.since {
            calls.retain(|c| c.resolved_timestamp().map(|t| t > since).unwrap_or(false));
        }
        calls.sort_by_key(|c| std::cmp::Reverse(c.resolved_timestamp()));
        calls.truncate(params.limit.max(0) as usize);
        Ok(calls)
    }

    async fn fetch_users(&self, params: &ListParams) -> AppResult<Vec<Value>> {
        let mut users = self.all_users().await?;
        users.truncate(params.limit.max(0) as usize);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_missing_file_is_an_error_not_a_panic() {
        let provider = LocalFileProvider::new("/nonexistent/dir");
        let err = provider
            .fetch_token_calls(&ListParams { limit: 10, since: None })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_since_filter_and_limit() {
        let dir = std::env::temp_dir().join(format!("callboard-local-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let body = serde_json::json!([
            {"group_name": "old", "updatedAt": "2025-06-01T00:00:00Z"},
            {"group_name": "mid", "updatedAt": "2025-06-02T00:00:00Z"},
            {"group_name": "new", "updatedAt": "2025-06-03T00:00:00Z"},
        ]);
        tokio::fs::write(dir.join("token_calls.json"), body.to_string()).await.unwrap();

        let provider = LocalFileProvider::new(&dir);
        let since = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let calls = provider
            .fetch_token_calls(&ListParams {
                limit: 1,
                since: Some(since),
            })
            .await
            .unwrap();

        // since过滤掉old，limit=1后只剩最新的一条
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].group_name.as_deref(), Some("new"));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
