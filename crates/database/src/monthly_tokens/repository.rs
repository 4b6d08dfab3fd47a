use super::model::GroupMonthlyTokens;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::FindOptions, Collection, IndexModel};
use tracing::info;
use utils::AppResult;

#[derive(Clone, Debug)]
pub struct MonthlyTokensRepository {
    collection: Collection<GroupMonthlyTokens>,
}

impl MonthlyTokensRepository {
    pub fn new(collection: Collection<GroupMonthlyTokens>) -> Self {
        Self { collection }
    }

    pub async fn init_indexes(&self) -> AppResult<()> {
        let indexes = vec![
            IndexModel::builder().keys(doc! { "createdAt": -1 }).build(),
            IndexModel::builder().keys(doc! { "group_name": 1, "month": -1 }).build(),
        ];
        self.collection.create_indexes(indexes, None).await?;
        info!("✅ group_monthly_tokens 索引初始化完成");
        Ok(())
    }

    /// 最新写入在前
    pub async fn list_newest(&self, limit: i64) -> AppResult<Vec<GroupMonthlyTokens>> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1, "month": -1 })
            .limit(limit)
            .build();
        let cursor = self.collection.find(doc! {}, options).await?;
        let docs: Vec<GroupMonthlyTokens> = cursor.try_collect().await?;
        Ok(docs)
    }
}
