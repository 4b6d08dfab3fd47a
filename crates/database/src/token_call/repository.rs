use super::model::{TokenCall, TIMESTAMP_FIELDS};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    options::FindOptions,
    Collection, IndexModel,
};
use tracing::info;
use utils::AppResult;

/// 喊单记录数据库操作接口（只读 + 索引初始化）
#[derive(Clone, Debug)]
pub struct TokenCallRepository {
    collection: Collection<TokenCall>,
}

impl TokenCallRepository {
    pub fn new(collection: Collection<TokenCall>) -> Self {
        Self { collection }
    }

    /// 初始化数据库索引
    pub async fn init_indexes(&self) -> AppResult<()> {
        let indexes = vec![
            // 时间戳索引 (排序/窗口统计用)
            IndexModel::builder().keys(doc! { "updatedAt": -1 }).build(),
            IndexModel::builder().keys(doc! { "last_updated": -1 }).build(),
            IndexModel::builder().keys(doc! { "createdAt": -1 }).build(),
            // 群组/代币索引 (distinct统计用)
            IndexModel::builder().keys(doc! { "group_name": 1 }).build(),
            IndexModel::builder().keys(doc! { "token_address": 1 }).build(),
        ];

        self.collection.create_indexes(indexes, None).await?;
        info!("✅ token_calls 索引初始化完成");
        Ok(())
    }

    /// 最新记录在前的列表查询
    pub async fn list(&self, limit: i64) -> AppResult<Vec<TokenCall>> {
        let options = FindOptions::builder()
            .sort(newest_first_sort())
            .limit(limit)
            .build();
        let cursor = self.collection.find(doc! {}, options).await?;
        let calls: Vec<TokenCall> = cursor.try_collect().await?;
        Ok(calls)
    }

    /// since之后的新记录。过滤在四个时间戳字段上做$or，
    /// 返回前再按解析后的时间戳精确排序（数据库排序只看字段字面值）。
    pub async fn list_since(&self, since: DateTime<Utc>, limit: i64) -> AppResult<Vec<TokenCall>> {
        let options = FindOptions::builder()
            .sort(newest_first_sort())
            .limit(limit)
            .build();
        let cursor = self
            .collection
            .find(timestamp_window_filter(since, None), options)
            .await?;
        let mut calls: Vec<TokenCall> = cursor.try_collect().await?;

        calls.retain(|c| c.resolved_timestamp().map(|t| t > since).unwrap_or(false));
        calls.sort_by_key(|c| std::cmp::Reverse(c.resolved_timestamp()));
        Ok(calls)
    }

    pub async fn count_all(&self) -> AppResult<u64> {
        let count = self.collection.count_documents(doc! {}, None).await?;
        Ok(count)
    }

    /// [start, end) 窗口内的记录数。end为None表示开区间到现在。
    pub async fn count_window(&self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> AppResult<u64> {
        let count = self
            .collection
            .count_documents(timestamp_window_filter(start, end), None)
            .await?;
        Ok(count)
    }

    pub async fn distinct_groups(&self) -> AppResult<u64> {
        let values = self.collection.distinct("group_name", None, None).await?;
        Ok(values.len() as u64)
    }

    pub async fn distinct_tokens(&self) -> AppResult<u64> {
        let values = self.collection.distinct("token_address", None, None).await?;
        Ok(values.len() as u64)
    }

    /// 最新一条记录的解析时间戳。
    /// 取各时间戳字段字面排序下的头部若干条，再在内存中解析取最大值，
    /// 避免字段之间字面序与实际时间序不一致。
    pub async fn latest_timestamp(&self) -> AppResult<Option<DateTime<Utc>>> {
        let options = FindOptions::builder().sort(newest_first_sort()).limit(20).build();
        let cursor = self.collection.find(doc! {}, options).await?;
        let calls: Vec<TokenCall> = cursor.try_collect().await?;
        Ok(calls.iter().filter_map(TokenCall::resolved_timestamp).max())
    }
}

fn newest_first_sort() -> Document {
    doc! { "updatedAt": -1, "last_updated": -1, "createdAt": -1 }
}

/// 窗口过滤：任一时间戳字段落入 [start, end) 即命中。
/// 只能匹配BSON日期类型的字段值，字符串时间戳交给内存侧解析兜底。
fn timestamp_window_filter(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Document {
    let clauses: Vec<Document> = TIMESTAMP_FIELDS
        .iter()
        .map(|field| {
            let mut range = doc! { "$gte": BsonDateTime::from_chrono(start) };
            if let Some(end) = end {
                range.insert("$lt", BsonDateTime::from_chrono(end));
            }
            doc! { *field: range }
        })
        .collect();
    doc! { "$or": clauses }
}
