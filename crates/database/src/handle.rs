use crate::Database;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use utils::{AppConfig, AppError, AppResult};

/// 进程级的惰性数据库单例。
///
/// 连接在首次使用时建立并缓存至进程结束，底层driver自带连接池，
/// 并发请求共享同一个client不需要额外加锁。未配置连接串是一种
/// 合法状态（走上游API回退），与连接失败区分开。
/// `reset()` 是测试专用的teardown钩子。
#[derive(Debug, Default)]
pub struct DatabaseHandle {
    inner: RwLock<Option<Arc<Database>>>,
}

impl DatabaseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mongo是否配置了连接串（不触发实际连接）
    pub fn is_configured(config: &AppConfig) -> bool {
        config.mongo_uri().is_some()
    }

    /// 获取已缓存的连接，或在首次调用时建立连接。
    /// 未配置连接串时返回 `ServiceUnavailable`，调用方据此转入下一个数据源。
    pub async fn get_or_connect(&self, config: &Arc<AppConfig>) -> AppResult<Arc<Database>> {
        if let Some(db) = self.inner.read().await.as_ref() {
            return Ok(db.clone());
        }

        let uri = config
            .mongo_uri()
            .ok_or_else(|| AppError::ServiceUnavailable("no mongo connection string configured".to_string()))?;

        let mut guard = self.inner.write().await;
        // 双重检查：等待写锁期间其他任务可能已经完成连接
        if let Some(db) = guard.as_ref() {
            return Ok(db.clone());
        }

        match Database::new(&uri, config.clone()).await {
            Ok(db) => {
                let db = Arc::new(db);
                *guard = Some(db.clone());
                Ok(db)
            }
            Err(e) => {
                warn!("⚠️ mongo connect failed: {}", e);
                Err(e)
            }
        }
    }

    /// 测试teardown：丢弃缓存的连接，下次访问重新建立
    pub async fn reset(&self) {
        let mut guard = self.inner.write().await;
        if guard.take().is_some() {
            info!("🧹 database handle reset");
        }
    }
}
