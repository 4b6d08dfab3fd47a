use crate::dtos::stats_dto::{StatsSnapshot, WindowDelta};
use crate::services::providers::{LocalFileProvider, UpstreamClient};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use database::{DashboardUser, DatabaseHandle, TokenCall};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use utils::{truncate_body, AppConfig, AppError, AppResult};

pub type DynStatsService = Arc<dyn StatsServiceTrait + Send + Sync>;

#[async_trait]
pub trait StatsServiceTrait {
    /// 看板统计快照。返回Value而不是固定结构，
    /// 因为上游回退路径是整体透传上游的JSON。
    async fn snapshot(&self) -> AppResult<Value>;
}

/// 统计聚合器。
/// 数据库可用时并发发起各项独立计数查询后合并；
/// 否则整体委托给上游API透传；最后才考虑本地文件聚合。
pub struct StatsService {
    config: Arc<AppConfig>,
    db: Arc<DatabaseHandle>,
    upstream: Option<Arc<UpstreamClient>>,
    local: Option<Arc<LocalFileProvider>>,
}

impl StatsService {
    pub fn new(
        config: Arc<AppConfig>,
        db: Arc<DatabaseHandle>,
        upstream: Option<Arc<UpstreamClient>>,
        local: Option<Arc<LocalFileProvider>>,
    ) -> Self {
        Self {
            config,
            db,
            upstream,
            local,
        }
    }

    /// Mongo路径：独立查询并发fan-out，合并为快照
    async fn mongo_snapshot(&self) -> AppResult<StatsSnapshot> {
        let db = self.db.get_or_connect(&self.config).await?;
        let now = Utc::now();
        let h1 = Duration::hours(1);
        let window = Duration::hours(self.config.dashboard_window_hours);

        let calls = &db.token_call_repository;
        let users = &db.user_repository;

        let (
            total_calls,
            distinct_groups,
            distinct_tokens,
            total_users,
            latest_call_at,
            calls_h1_curr,
            calls_h1_prev,
            calls_hw_curr,
            calls_hw_prev,
            users_hw_curr,
            users_hw_prev,
        ) = tokio::try_join!(
            calls.count_all(),
            calls.distinct_groups(),
            calls.distinct_tokens(),
            users.count_all(),
            calls.latest_timestamp(),
            calls.count_window(now - h1, None),
            calls.count_window(now - h1 - h1, Some(now - h1)),
            calls.count_window(now - window, None),
            calls.count_window(now - window - window, Some(now - window)),
            users.count_window(now - window, None),
            users.count_window(now - window - window, Some(now - window)),
        )?;

        Ok(StatsSnapshot {
            total_calls,
            distinct_groups,
            distinct_tokens,
            total_users,
            latest_call_at,
            calls_h1: WindowDelta {
                curr: calls_h1_curr,
                prev: calls_h1_prev,
            },
            calls_h24: WindowDelta {
                curr: calls_hw_curr,
                prev: calls_hw_prev,
            },
            users_h24: WindowDelta {
                curr: users_hw_curr,
                prev: users_hw_prev,
            },
            generated_at: now,
            source: "mongo".to_string(),
        })
    }

    /// 上游路径：JSON整体透传，只追加调试元信息。
    /// 响应体不是合法JSON时报网关错误并附截断预览。
    async fn upstream_snapshot(&self, upstream: &UpstreamClient) -> AppResult<Value> {
        let started = Instant::now();
        let body = upstream.fetch_stats_text().await?;
        let mut value = parse_stats_body(&body)?;

        if let Some(map) = value.as_object_mut() {
            map.insert(
                "debug".to_string(),
                json!({
                    "source": "upstream",
                    "upstream_url": upstream.base_url(),
                    "elapsed_ms": started.elapsed().as_millis() as u64,
                }),
            );
        }
        Ok(value)
    }

    /// 本地文件路径：全量读入后在内存里做窗口聚合
    async fn local_snapshot(&self, local: &LocalFileProvider) -> AppResult<StatsSnapshot> {
        let calls = local.all_token_calls().await?;
        let users = local.all_users().await?;
        let now = Utc::now();
        let window = Duration::hours(self.config.dashboard_window_hours);

        let call_ts: Vec<DateTime<Utc>> = calls.iter().filter_map(TokenCall::resolved_timestamp).collect();
        let user_ts: Vec<DateTime<Utc>> = users
            .iter()
            .filter_map(|u| serde_json::from_value::<DashboardUser>(u.clone()).ok())
            .filter_map(|u| {
                u.created_at
                    .as_ref()
                    .and_then(|t| t.to_datetime())
                    .or_else(|| u.updated_at.as_ref().and_then(|t| t.to_datetime()))
            })
            .collect();

        let mut groups: Vec<&str> = calls.iter().filter_map(|c| c.group_name.as_deref()).collect();
        groups.sort_unstable();
        groups.dedup();
        let mut tokens: Vec<&str> = calls.iter().filter_map(|c| c.token_address.as_deref()).collect();
        tokens.sort_unstable();
        tokens.dedup();

        Ok(StatsSnapshot {
            total_calls: calls.len() as u64,
            distinct_groups: groups.len() as u64,
            distinct_tokens: tokens.len() as u64,
            total_users: users.len() as u64,
            latest_call_at: call_ts.iter().max().copied(),
            calls_h1: window_counts(&call_ts, now, Duration::hours(1)),
            calls_h24: window_counts(&call_ts, now, window),
            users_h24: window_counts(&user_ts, now, window),
            generated_at: now,
            source: "local".to_string(),
        })
    }
}

#[async_trait]
impl StatsServiceTrait for StatsService {
    async fn snapshot(&self) -> AppResult<Value> {
        if DatabaseHandle::is_configured(&self.config) {
            match self.mongo_snapshot().await {
                Ok(snapshot) => return Ok(serde_json::to_value(snapshot).map_err(anyhow::Error::from)?),
                Err(e) => warn!("⚠️ mongo stats failed, trying upstream: {}", e),
            }
        }

        if let Some(upstream) = &self.upstream {
            match self.upstream_snapshot(upstream).await {
                Ok(value) => return Ok(value),
                // 网关错误（不可达/非JSON）直接上抛，不再尝试本地兜底，
                // 半真半假的统计比报错更有误导性
                Err(e @ AppError::BadGateway { .. }) => return Err(e),
                Err(e) => warn!("⚠️ upstream stats failed: {}", e),
            }
        }

        if let Some(local) = &self.local {
            let snapshot = self.local_snapshot(local).await?;
            return Ok(serde_json::to_value(snapshot).map_err(anyhow::Error::from)?);
        }

        Err(AppError::InternalServerErrorWithContext(
            "no stats source configured (mongo/upstream both missing)".to_string(),
        ))
    }
}

/// 上游统计响应体解析。非JSON时报网关错误并附截断预览，
/// 方便在前端直接看到上游实际返回了什么（HTML错误页等）
fn parse_stats_body(body: &str) -> AppResult<Value> {
    serde_json::from_str(body).map_err(|_| AppError::BadGateway {
        message: "upstream stats endpoint returned a non-JSON body".to_string(),
        preview: Some(truncate_body(body)),
    })
}

/// 滑动窗口计数：curr统计 (now-window, now] 内的时间戳，
/// prev统计再往前一个等长窗口，用于计算增长趋势
pub fn window_counts(timestamps: &[DateTime<Utc>], now: DateTime<Utc>, window: Duration) -> WindowDelta {
    let curr_start = now - window;
    let prev_start = curr_start - window;

    let curr = timestamps.iter().filter(|t| **t > curr_start && **t <= now).count() as u64;
    let prev = timestamps
        .iter()
        .filter(|t| **t > prev_start && **t <= curr_start)
        .count() as u64;

    WindowDelta { curr, prev }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours_ago(now: DateTime<Utc>, h: i64) -> DateTime<Utc> {
        now - Duration::hours(h)
    }

    #[test]
    fn test_window_counts_24h_example() {
        let now = Utc::now();
        // 10条记录，其中3条严格落在最近24小时内
        let timestamps = vec![
            hours_ago(now, 1),
            hours_ago(now, 12),
            hours_ago(now, 23),
            hours_ago(now, 25),
            hours_ago(now, 30),
            hours_ago(now, 40),
            hours_ago(now, 47),
            hours_ago(now, 50),
            hours_ago(now, 72),
            hours_ago(now, 100),
        ];
        let delta = window_counts(&timestamps, now, Duration::hours(24));
        assert_eq!(delta.curr, 3);
        // 前一个24小时窗口: 25h/30h/40h/47h前的4条
        assert_eq!(delta.prev, 4);
    }

    #[test]
    fn test_parse_stats_body_passes_json_through() {
        let value = parse_stats_body(r#"{"total_calls": 7}"#).unwrap();
        assert_eq!(value["total_calls"], 7);
    }

    #[test]
    fn test_parse_stats_body_rejects_html_with_preview() {
        let html = format!("<html><body>{}</body></html>", "x".repeat(1000));
        let err = parse_stats_body(&html).unwrap_err();
        match err {
            AppError::BadGateway { preview: Some(p), .. } => {
                assert!(p.starts_with("<html>"));
                assert!(p.len() <= utils::BODY_PREVIEW_LIMIT + 3);
            }
            other => panic!("expected BadGateway, got {:?}", other),
        }
    }

    #[test]
    fn test_window_counts_empty_input() {
        let delta = window_counts(&[], Utc::now(), Duration::hours(24));
        assert_eq!(delta, WindowDelta::default());
    }

    #[tokio::test]
    async fn test_snapshot_surfaces_unreachable_upstream_as_bad_gateway() {
        let mut config = AppConfig::new_for_test();
        config.upstream_api_url = Some("http://127.0.0.1:1".to_string());
        let config = Arc::new(config);

        let upstream = UpstreamClient::from_config(&config).map(Arc::new);
        let svc = StatsService::new(config.clone(), Arc::new(DatabaseHandle::new()), upstream, None);

        // 上游配置了但不可达 → 502，而不是"没有数据源"的500
        let err = svc.snapshot().await.unwrap_err();
        assert!(matches!(err, AppError::BadGateway { .. }));
    }

    #[test]
    fn test_window_counts_boundary_is_exclusive_on_the_left() {
        let now = Utc::now();
        let exactly_on_boundary = now - Duration::hours(24);
        let delta = window_counts(&[exactly_on_boundary], now, Duration::hours(24));
        // 正好落在窗口边界的记录归入前一窗口
        assert_eq!(delta.curr, 0);
        assert_eq!(delta.prev, 1);
    }
}
