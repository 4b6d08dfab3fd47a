use super::{DataProvider, ListParams};
use async_trait::async_trait;
use database::TokenCall;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use utils::{truncate_body, AppConfig, AppError, AppResult};

/// 上游API客户端（数据库不可用时的回退数据源）
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    stats_path: String,
    calls_path: String,
    users_path: String,
}

impl UpstreamClient {
    /// 未配置上游地址时返回None，解析链里不装配该数据源
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let base_url = config.upstream_api_url.clone()?;
        Some(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: config.upstream_api_token.clone(),
            stats_path: config.upstream_stats_path.clone(),
            calls_path: config.upstream_calls_path.clone(),
            users_path: config.upstream_users_path.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.get(&url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// 请求并返回原始响应体文本。
    /// 传输层失败（连接拒绝、超时、DNS）与非2xx状态一律归为网关错误，
    /// 调用方据此返回502而不是笼统的500。
    async fn fetch_text(&self, path: &str, query: &[(&str, String)]) -> AppResult<String> {
        let response = self
            .request(path)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::BadGateway {
                message: format!("upstream unreachable: {}", e),
                preview: None,
            })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| AppError::BadGateway {
            message: format!("failed to read upstream response body: {}", e),
            preview: None,
        })?;

        if !status.is_success() {
            return Err(AppError::BadGateway {
                message: format!("upstream returned status {}", status.as_u16()),
                preview: Some(truncate_body(&body)),
            });
        }
        Ok(body)
    }

    /// 请求并解析JSON。响应体不是合法JSON时同样按网关错误处理。
    pub async fn fetch_json(&self, path: &str, query: &[(&str, String)]) -> AppResult<Value> {
        let body = self.fetch_text(path, query).await?;
        serde_json::from_str(&body).map_err(|_| AppError::BadGateway {
            message: "upstream returned a non-JSON body".to_string(),
            preview: Some(truncate_body(&body)),
        })
    }

    /// 统计接口的原始响应体（调用方自行解析，以便在解析失败时展示预览）
    pub async fn fetch_stats_text(&self) -> AppResult<String> {
        info!("🔍 delegating stats to upstream: {}{}", self.base_url, self.stats_path);
        self.fetch_text(&self.stats_path, &[]).await
    }

    pub async fn fetch_token_calls(&self, params: &ListParams) -> AppResult<Vec<TokenCall>> {
        let mut query = vec![("limit", params.limit.to_string())];
        if let Some(since) = params.since {
            query.push(("since", since.to_rfc3339()));
        }
        let json = self.fetch_json(&self.calls_path, &query).await?;
        parse_record_array(json)
    }

    pub async fn fetch_users(&self, params: &ListParams) -> AppResult<Vec<Value>> {
        let query = vec![("limit", params.limit.to_string())];
        let json = self.fetch_json(&self.users_path, &query).await?;
        match unwrap_data(json) {
            Value::Array(items) => Ok(items),
            other => Err(AppError::BadGateway {
                message: "upstream users payload is not an array".to_string(),
                preview: Some(truncate_body(&other.to_string())),
            }),
        }
    }
}

/// 上游返回裸数组或 `{data: [...]}` 包装，两种都接受
fn unwrap_data(json: Value) -> Value {
    match json {
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Object(map)),
        other => other,
    }
}

fn parse_record_array(json: Value) -> AppResult<Vec<TokenCall>> {
    match unwrap_data(json) {
        Value::Array(items) => {
            let calls = items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<TokenCall>(item).ok())
                .collect();
            Ok(calls)
        }
        other => Err(AppError::BadGateway {
            message: "upstream token-calls payload is not an array".to_string(),
            preview: Some(truncate_body(&other.to_string())),
        }),
    }
}

pub struct UpstreamProvider {
    client: Arc<UpstreamClient>,
}

impl UpstreamProvider {
    pub fn new(client: Arc<UpstreamClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataProvider for UpstreamProvider {
    fn name(&self) -> &'static str {
        "upstream"
    }

    async fn fetch_token_calls(&self, params: &ListParams) -> AppResult<Vec<TokenCall>> {
        self.client.fetch_token_calls(params).await
    }

    async fn fetch_users(&self, params: &ListParams) -> AppResult<Vec<Value>> {
        self.client.fetch_users(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_data_accepts_both_shapes() {
        let wrapped = serde_json::json!({"data": [1, 2]});
        assert_eq!(unwrap_data(wrapped), serde_json::json!([1, 2]));

        let bare = serde_json::json!([3]);
        assert_eq!(unwrap_data(bare), serde_json::json!([3]));
    }

    #[test]
    fn test_parse_record_array_skips_malformed_entries() {
        let json = serde_json::json!([
            {"group_name": "alpha", "updatedAt": "2025-06-01T00:00:00Z"},
            "not an object",
        ]);
        let calls = parse_record_array(json).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].group_name.as_deref(), Some("alpha"));
    }

    #[test]
    fn test_parse_record_array_rejects_non_array() {
        let err = parse_record_array(serde_json::json!({"message": "nope"})).unwrap_err();
        assert!(matches!(err, AppError::BadGateway { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_maps_to_bad_gateway() {
        // 端口1没有监听进程，连接必然被拒绝
        let mut config = AppConfig::new_for_test();
        config.upstream_api_url = Some("http://127.0.0.1:1".to_string());
        let client = UpstreamClient::from_config(&config).unwrap();

        let err = client.fetch_stats_text().await.unwrap_err();
        assert!(matches!(err, AppError::BadGateway { preview: None, .. }));
    }
}
