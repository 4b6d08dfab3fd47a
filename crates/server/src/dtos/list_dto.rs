use chrono::{DateTime, Utc};
use database::TsValue;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// 列表接口limit上限
pub const MAX_LIST_LIMIT: i64 = 500;
pub const DEFAULT_LIST_LIMIT: i64 = 100;
/// latest接口limit上限
pub const MAX_LATEST_LIMIT: i64 = 50;
pub const DEFAULT_LATEST_LIMIT: i64 = 20;
/// SSE流limit上限
pub const MAX_STREAM_LIMIT: i64 = 10;
pub const DEFAULT_STREAM_LIMIT: i64 = 5;

#[derive(Clone, Deserialize, Debug, Default, IntoParams)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Clone, Deserialize, Debug, Default, IntoParams)]
pub struct SinceQuery {
    /// RFC3339或epoch毫秒
    pub since: Option<String>,
    pub limit: Option<i64>,
}

/// limit统一钳制到 [1, max]，缺省取default
pub fn clamp_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}

/// since参数解析：RFC3339字符串或epoch毫秒/秒
pub fn parse_since(raw: &str) -> Option<DateTime<Utc>> {
    TsValue::Text(raw.to_string()).to_datetime()
}

/// latest接口的响应包装
#[derive(Clone, Serialize, Debug)]
pub struct LatestResponse<T> {
    pub data: Vec<T>,
    /// 服务端生成时间
    pub timestamp: String,
    pub count: usize,
}

impl<T> LatestResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        let count = data.len();
        Self {
            data,
            timestamp: Utc::now().to_rfc3339(),
            count,
        }
    }
}
