use crate::token_call::model::TsValue;
use mongodb::bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

/// 群组月度代币汇总，由外部任务按月写入的独立集合
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GroupMonthlyTokens {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    /// 格式 "YYYY-MM"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<TsValue>,
    #[serde(flatten)]
    pub extra: Document,
}
