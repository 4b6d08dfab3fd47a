////////////////////////////////////////////////////////////////////////
//
// 1. 每个Domain(Entity)单独一个文件夹
// 2. 每个Domain由两部分组成:
//    - model: 定义Schema
//    - repository: 实际的数据库底层操作
//
//////////////////////////////////////////////////////////////////////

use mongodb::{bson::doc, Client, Collection};
use std::sync::Arc;
use tracing::info;
use utils::{AppConfig, AppResult};

pub mod handle;
pub mod monthly_tokens;
pub mod token_call;
pub mod user;

pub use handle::DatabaseHandle;

#[derive(Clone, Debug)]
pub struct Database {
    pub token_calls: Collection<token_call::model::TokenCall>,
    pub users: Collection<user::model::DashboardUser>,
    pub group_monthly_tokens: Collection<monthly_tokens::model::GroupMonthlyTokens>,
    // 仓库层
    pub token_call_repository: token_call::repository::TokenCallRepository,
    pub user_repository: user::repository::UserRepository,
    pub monthly_tokens_repository: monthly_tokens::repository::MonthlyTokensRepository,
    db: mongodb::Database,
}

impl Database {
    /// 建立连接并绑定集合。集合名可通过环境变量覆盖。
    pub async fn new(uri: &str, config: Arc<AppConfig>) -> AppResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db: mongodb::Database = client.database(&config.mongo_db);

        let token_calls = db.collection(&config.token_calls_collection);
        let users = db.collection(&config.users_collection);
        let group_monthly_tokens = db.collection(&config.monthly_tokens_collection);

        // 初始化仓库层
        let token_call_repository = token_call::repository::TokenCallRepository::new(token_calls.clone());
        let user_repository = user::repository::UserRepository::new(users.clone());
        let monthly_tokens_repository =
            monthly_tokens::repository::MonthlyTokensRepository::new(group_monthly_tokens.clone());

        info!("🧱 database({:#}) connected.", &config.mongo_db);

        Ok(Database {
            token_calls,
            users,
            group_monthly_tokens,
            token_call_repository,
            user_repository,
            monthly_tokens_repository,
            db,
        })
    }

    /// 连通性检查，调试接口用
    pub async fn ping(&self) -> AppResult<()> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    pub async fn init_repository_indexes(&self) -> AppResult<()> {
        let _result = self.token_call_repository.init_indexes().await;
        let _result = self.monthly_tokens_repository.init_indexes().await;

        info!("✅ 数据库索引初始化完成");
        Ok(())
    }
}

pub use token_call::model::{TokenCall, TsValue};
pub use user::model::DashboardUser;
pub use monthly_tokens::model::GroupMonthlyTokens;
