use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 滑动窗口计数：curr为最近一个窗口内的记录数，
/// prev为再往前一个等长窗口，前端据此算增长率
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, ToSchema)]
pub struct WindowDelta {
    pub curr: u64,
    pub prev: u64,
}

/// 看板统计快照。每次请求即时计算，不落库。
#[derive(Clone, Serialize, Deserialize, Debug, Default, ToSchema)]
pub struct StatsSnapshot {
    pub total_calls: u64,
    pub distinct_groups: u64,
    pub distinct_tokens: u64,
    pub total_users: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_call_at: Option<DateTime<Utc>>,
    pub calls_h1: WindowDelta,
    pub calls_h24: WindowDelta,
    pub users_h24: WindowDelta,
    pub generated_at: DateTime<Utc>,
    /// 数据来源标记: "mongo" | "upstream" | "local"
    pub source: String,
}
