use crate::token_call::model::TsValue;
use mongodb::bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

/// 看板用户记录。除时间戳外没有强制的文档结构，
/// 本系统只读取创建/更新时间用于窗口统计。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DashboardUser {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<TsValue>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<TsValue>,
    #[serde(flatten)]
    pub extra: Document,
}
