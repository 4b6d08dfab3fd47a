use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

/// 时间戳字段的实际取值形态。
///
/// 外部采集进程写入的文档没有强制Schema，同一个字段在不同批次里
/// 可能是BSON日期、RFC3339字符串或epoch毫秒数。用显式的sum type
/// 建模而不是在读取处静默吞掉格式错误的数据。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TsValue {
    DateTime(mongodb::bson::DateTime),
    Millis(i64),
    Text(String),
}

impl TsValue {
    /// 归一化为UTC时间。无法解析时返回None，调用方按优先级检查下一个字段。
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            TsValue::DateTime(dt) => Some(dt.to_chrono()),
            // 1e12以下按秒处理（毫秒值在2001年之前才会低于这个量级）
            TsValue::Millis(v) => {
                if *v > 1_000_000_000_000 {
                    DateTime::from_timestamp_millis(*v)
                } else {
                    DateTime::from_timestamp(*v, 0)
                }
            }
            TsValue::Text(s) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    return Some(dt.with_timezone(&Utc));
                }
                // 部分采集批次写的是纯数字字符串
                s.trim().parse::<i64>().ok().and_then(|v| TsValue::Millis(v).to_datetime())
            }
        }
    }
}

/// 首发用户信息（嵌套文档）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FirstPoster {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<TsValue>,
    #[serde(flatten)]
    pub extra: Document,
}

/// 代币喊单记录。由外部采集进程写入，本系统只读。
///
/// 字段基本都是可选的：不同时期的采集器写入的字段集合不一致，
/// 时间戳分散在四个可能的字段里。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenCall {
    /// MongoDB文档ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// 来源群组
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    /// 代币地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<TsValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<TsValue>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<TsValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_poster: Option<FirstPoster>,
    /// 未建模的剩余字段原样保留，序列化回前端时不丢失
    #[serde(flatten)]
    pub extra: Document,
}

/// 时间戳字段的固定优先级顺序（窗口统计与流式推送都依赖该顺序）
pub const TIMESTAMP_FIELDS: [&str; 4] = ["updatedAt", "last_updated", "createdAt", "first_poster.posted_at"];

impl TokenCall {
    /// 按固定优先级解析记录时间戳:
    /// `updatedAt` → `last_updated` → `createdAt` → `first_poster.posted_at`。
    /// 某个字段存在但无法解析时继续检查下一个；全部缺失或不可解析返回None。
    pub fn resolved_timestamp(&self) -> Option<DateTime<Utc>> {
        if let Some(dt) = self.updated_at.as_ref().and_then(TsValue::to_datetime) {
            return Some(dt);
        }
        if let Some(dt) = self.last_updated.as_ref().and_then(TsValue::to_datetime) {
            return Some(dt);
        }
        if let Some(dt) = self.created_at.as_ref().and_then(TsValue::to_datetime) {
            return Some(dt);
        }
        self.first_poster
            .as_ref()
            .and_then(|p| p.posted_at.as_ref())
            .and_then(TsValue::to_datetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(s: &str) -> TsValue {
        TsValue::Text(s.to_string())
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_resolved_timestamp_returns_none_without_fields() {
        let call = TokenCall::default();
        assert_eq!(call.resolved_timestamp(), None);
    }

    #[test]
    fn test_resolved_timestamp_prefers_updated_at() {
        let call = TokenCall {
            updated_at: Some(ts("2025-06-04T00:00:00Z")),
            last_updated: Some(ts("2025-06-03T00:00:00Z")),
            created_at: Some(ts("2025-06-02T00:00:00Z")),
            first_poster: Some(FirstPoster {
                posted_at: Some(ts("2025-06-01T00:00:00Z")),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(call.resolved_timestamp(), Some(day(4)));
    }

    #[test]
    fn test_resolved_timestamp_falls_through_priority_order() {
        let call = TokenCall {
            created_at: Some(ts("2025-06-02T00:00:00Z")),
            first_poster: Some(FirstPoster {
                posted_at: Some(ts("2025-06-01T00:00:00Z")),
                ..Default::default()
            }),
            ..Default::default()
        };
        // createdAt优先于嵌套的posted_at
        assert_eq!(call.resolved_timestamp(), Some(day(2)));

        let call = TokenCall {
            first_poster: Some(FirstPoster {
                posted_at: Some(ts("2025-06-01T00:00:00Z")),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(call.resolved_timestamp(), Some(day(1)));
    }

    #[test]
    fn test_resolved_timestamp_skips_unparseable_values() {
        let call = TokenCall {
            updated_at: Some(ts("not a date")),
            created_at: Some(ts("2025-06-02T00:00:00Z")),
            ..Default::default()
        };
        assert_eq!(call.resolved_timestamp(), Some(day(2)));
    }

    #[test]
    fn test_ts_value_millis_and_seconds() {
        let millis = TsValue::Millis(1_750_000_000_000);
        let seconds = TsValue::Millis(1_750_000_000);
        assert_eq!(millis.to_datetime(), seconds.to_datetime());
    }

    #[test]
    fn test_ts_value_numeric_string() {
        let text = TsValue::Text("1750000000".to_string());
        assert_eq!(text.to_datetime(), TsValue::Millis(1_750_000_000).to_datetime());
    }

    #[test]
    fn test_token_call_deserializes_loose_json() {
        let raw = serde_json::json!({
            "group_name": "alpha_calls",
            "token_address": "0xabc",
            "updatedAt": "2025-06-04T12:00:00Z",
            "score": 17,
            "first_poster": { "username": "deg3n", "posted_at": 1717500000000i64 }
        });
        let call: TokenCall = serde_json::from_value(raw).unwrap();
        assert_eq!(call.group_name.as_deref(), Some("alpha_calls"));
        assert!(call.resolved_timestamp().is_some());
        assert!(call.extra.contains_key("score"));
    }
}
