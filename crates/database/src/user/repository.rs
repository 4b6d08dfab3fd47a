use super::model::DashboardUser;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    options::FindOptions,
    Collection,
};
use utils::AppResult;

#[derive(Clone, Debug)]
pub struct UserRepository {
    collection: Collection<DashboardUser>,
}

impl UserRepository {
    pub fn new(collection: Collection<DashboardUser>) -> Self {
        Self { collection }
    }

    pub async fn list(&self, limit: i64) -> AppResult<Vec<DashboardUser>> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .limit(limit)
            .build();
        let cursor = self.collection.find(doc! {}, options).await?;
        let users: Vec<DashboardUser> = cursor.try_collect().await?;
        Ok(users)
    }

    pub async fn count_all(&self) -> AppResult<u64> {
        let count = self.collection.count_documents(doc! {}, None).await?;
        Ok(count)
    }

    /// [start, end) 内新增/更新的用户数
    pub async fn count_window(&self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> AppResult<u64> {
        let count = self.collection.count_documents(window_filter(start, end), None).await?;
        Ok(count)
    }
}

fn window_filter(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Document {
    let clauses: Vec<Document> = ["createdAt", "updatedAt"]
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
