use crate::services::providers::{ListParams, SourceResolver};
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use database::TokenCall;
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};
use utils::AppResult;

/// 轮询间隔
pub const STREAM_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// 墙钟上限。托管平台单次执行限制60秒，留出5秒余量。
pub const STREAM_DEADLINE: Duration = Duration::from_secs(55);
/// 单条连接最多推送的数据帧数
pub const MAX_STREAM_MESSAGES: usize = 100;

#[derive(Clone, Copy, Debug)]
pub struct StreamLimits {
    pub max_messages: usize,
    pub deadline: Duration,
    pub poll_interval: Duration,
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self {
            max_messages: MAX_STREAM_MESSAGES,
            deadline: STREAM_DEADLINE,
            poll_interval: STREAM_POLL_INTERVAL,
        }
    }
}

/// 关闭原因（随最后一个done帧发给客户端）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    MessageLimit,
    DeadlineReached,
    ClientGone,
}

/// 推送循环的显式状态机。
/// 两个独立的终止条件（消息数、墙钟）和客户端断开都收敛到
/// Terminating，统一走一次收尾逻辑，避免分散的定时器清理。
#[derive(Debug, PartialEq)]
enum StreamPhase {
    Streaming,
    Terminating(CloseReason),
    Closed,
}

/// 通过channel传递的帧，到出口处再转成SSE Event
#[derive(Debug)]
pub enum StreamFrame {
    Data(Box<TokenCall>),
    Heartbeat { ts: DateTime<Utc> },
    Done { reason: CloseReason },
}

impl StreamFrame {
    fn into_event(self) -> AppResult<Event> {
        let event = match self {
            StreamFrame::Data(call) => Event::default()
                .event("token_call")
                .json_data(&*call)
                .map_err(anyhow::Error::from)?,
            StreamFrame::Heartbeat { ts } => Event::default()
                .event("heartbeat")
                .json_data(json!({ "ts": ts.to_rfc3339() }))
                .map_err(anyhow::Error::from)?,
            StreamFrame::Done { reason } => Event::default()
                .event("done")
                .json_data(json!({ "reason": reason }))
                .map_err(anyhow::Error::from)?,
        };
        Ok(event)
    }
}

pub struct StreamService {
    resolver: Arc<SourceResolver>,
}

impl StreamService {
    pub fn new(resolver: Arc<SourceResolver>) -> Self {
        Self { resolver }
    }

    /// 打开一条SSE连接：立即尝试一次拉取，之后按固定间隔轮询，
    /// 新记录逐条单帧推送，空转的tick发心跳帧。
    pub fn open(
        &self,
        params: ListParams,
        limits: StreamLimits,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        let (tx, rx) = mpsc::channel::<StreamFrame>(32);
        tokio::spawn(run_stream(self.resolver.clone(), params, limits, tx));

        let events = ReceiverStream::new(rx).map(|frame| {
            let event = frame.into_event().unwrap_or_else(|e| {
                warn!("⚠️ sse frame serialization failed: {}", e);
                Event::default().event("heartbeat")
            });
            Ok::<_, Infallible>(event)
        });

        Sse::new(events).keep_alive(KeepAlive::default())
    }
}

/// 带墙钟上限的发送。消费端停滞时send会一直阻塞，
/// 截止时间在发送中途也必须生效，否则慢客户端能把连接拖过上限。
async fn send_within(
    tx: &mpsc::Sender<StreamFrame>,
    frame: StreamFrame,
    deadline: Instant,
) -> Result<(), CloseReason> {
    match tokio::time::timeout_at(deadline, tx.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(CloseReason::ClientGone),
        Err(_) => Err(CloseReason::DeadlineReached),
    }
}

/// 轮询主循环。watermark是已推送记录的最大时间戳，
/// 客户端重连时通过since参数自带恢复点，服务端不保存任何偏移。
pub(crate) async fn run_stream(
    resolver: Arc<SourceResolver>,
    params: ListParams,
    limits: StreamLimits,
    tx: mpsc::Sender<StreamFrame>,
) {
    let deadline = Instant::now() + limits.deadline;
    let mut watermark = params.since;
    let mut sent = 0usize;
    let mut phase = StreamPhase::Streaming;

    let mut ticker = tokio::time::interval(limits.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while phase == StreamPhase::Streaming {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                phase = StreamPhase::Terminating(CloseReason::DeadlineReached);
            }
            _ = ticker.tick() => {
                let fetch = ListParams { limit: params.limit, since: watermark };
                // 拉取失败在resolver内部已记日志，这里按空转处理
                let calls = resolver.token_calls(&fetch).await;

                let mut fresh: Vec<TokenCall> = calls
                    .into_iter()
                    .filter(|c| match (watermark, c.resolved_timestamp()) {
                        (Some(w), Some(t)) => t > w,
                        (None, Some(_)) => true,
                        // 没有可解析时间戳的记录无法定位水位，不推送
                        _ => false,
                    })
                    .collect();
                // 按时间升序推送，保证客户端按发生顺序收到
                fresh.sort_by_key(|c| c.resolved_timestamp());

                if fresh.is_empty() {
                    if let Err(reason) = send_within(&tx, StreamFrame::Heartbeat { ts: Utc::now() }, deadline).await {
                        phase = StreamPhase::Terminating(reason);
                    }
                    continue;
                }

                for call in fresh {
                    if let Some(t) = call.resolved_timestamp() {
                        if watermark.map(|w| t > w).unwrap_or(true) {
                            watermark = Some(t);
                        }
                    }
                    if let Err(reason) = send_within(&tx, StreamFrame::Data(Box::new(call)), deadline).await {
                        phase = StreamPhase::Terminating(reason);
                        break;
                    }
                    sent += 1;
                    if sent >= limits.max_messages {
                        phase = StreamPhase::Terminating(CloseReason::MessageLimit);
                        break;
                    }
                }
            }
        }
    }

    if let StreamPhase::Terminating(reason) = phase {
        if reason != CloseReason::ClientGone {
            // 收尾不再等待：通道满（消费端停滞）时done帧只尽力投递
            let _ = tx.try_send(StreamFrame::Done { reason });
        }
        phase = StreamPhase::Closed;
    }
    debug_assert_eq!(phase, StreamPhase::Closed);
    debug!("📡 sse stream closed ({} data frames)", sent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::{DataProvider, DynDataProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI64, Ordering};
    use utils::AppResult;

    /// 每次拉取都返回一条更新时间戳的新记录
    struct TickingProvider {
        counter: AtomicI64,
    }

    #[async_trait]
    impl DataProvider for TickingProvider {
        fn name(&self) -> &'static str {
            "ticking"
        }

        async fn fetch_token_calls(&self, _params: &ListParams) -> AppResult<Vec<TokenCall>> {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            let call: TokenCall = serde_json::from_value(serde_json::json!({
                "group_name": format!("g{}", n),
                "updatedAt": 1_750_000_000_000i64 + n * 1000,
            }))
            .unwrap();
            Ok(vec![call])
        }

        async fn fetch_users(&self, _params: &ListParams) -> AppResult<Vec<serde_json::Value>> {
            Ok(vec![])
        }
    }

    /// 单次拉取返回一大批记录
    struct BurstProvider;

    #[async_trait]
    impl DataProvider for BurstProvider {
        fn name(&self) -> &'static str {
            "burst"
        }

        async fn fetch_token_calls(&self, _params: &ListParams) -> AppResult<Vec<TokenCall>> {
            let calls = (0..50)
                .map(|n| {
                    serde_json::from_value(serde_json::json!({
                        "group_name": format!("g{}", n),
                        "updatedAt": 1_750_000_000_000i64 + n * 1000,
                    }))
                    .unwrap()
                })
                .collect();
            Ok(calls)
        }

        async fn fetch_users(&self, _params: &ListParams) -> AppResult<Vec<serde_json::Value>> {
            Ok(vec![])
        }
    }

    /// 永远没有新数据的数据源
    struct SilentProvider;

    #[async_trait]
    impl DataProvider for SilentProvider {
        fn name(&self) -> &'static str {
            "silent"
        }

        async fn fetch_token_calls(&self, _params: &ListParams) -> AppResult<Vec<TokenCall>> {
            Ok(vec![])
        }

        async fn fetch_users(&self, _params: &ListParams) -> AppResult<Vec<serde_json::Value>> {
            Ok(vec![])
        }
    }

    fn resolver_of(provider: DynDataProvider) -> Arc<SourceResolver> {
        Arc::new(SourceResolver::new(vec![provider]))
    }

    async fn collect_frames(mut rx: mpsc::Receiver<StreamFrame>) -> Vec<StreamFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_stops_at_message_limit() {
        let resolver = resolver_of(Arc::new(TickingProvider {
            counter: AtomicI64::new(0),
        }));
        let limits = StreamLimits {
            max_messages: 3,
            deadline: Duration::from_secs(600),
            poll_interval: Duration::from_secs(3),
        };
        let (tx, rx) = mpsc::channel(32);
        let task = tokio::spawn(run_stream(resolver, ListParams { limit: 5, since: None }, limits, tx));

        let frames = collect_frames(rx).await;
        task.await.unwrap();

        let data_count = frames.iter().filter(|f| matches!(f, StreamFrame::Data(_))).count();
        assert_eq!(data_count, 3);
        assert!(matches!(
            frames.last(),
            Some(StreamFrame::Done {
                reason: CloseReason::MessageLimit
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_closes_at_deadline_with_heartbeats() {
        let resolver = resolver_of(Arc::new(SilentProvider));
        let limits = StreamLimits {
            max_messages: 100,
            deadline: Duration::from_secs(10),
            poll_interval: Duration::from_secs(3),
        };
        let (tx, rx) = mpsc::channel(32);
        let task = tokio::spawn(run_stream(resolver, ListParams { limit: 5, since: None }, limits, tx));

        let frames = collect_frames(rx).await;
        task.await.unwrap();

        assert!(frames.iter().any(|f| matches!(f, StreamFrame::Heartbeat { .. })));
        assert!(frames.iter().all(|f| !matches!(f, StreamFrame::Data(_))));
        assert!(matches!(
            frames.last(),
            Some(StreamFrame::Done {
                reason: CloseReason::DeadlineReached
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_never_exceeds_message_cap_even_with_burst() {
        let resolver = resolver_of(Arc::new(BurstProvider));
        let limits = StreamLimits {
            max_messages: 10,
            deadline: Duration::from_secs(600),
            poll_interval: Duration::from_secs(3),
        };
        let (tx, rx) = mpsc::channel(256);
        let task = tokio::spawn(run_stream(resolver, ListParams { limit: 10, since: None }, limits, tx));

        let frames = collect_frames(rx).await;
        task.await.unwrap();

        let data_count = frames.iter().filter(|f| matches!(f, StreamFrame::Data(_))).count();
        assert_eq!(data_count, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_consumer_cannot_hold_stream_past_deadline() {
        let resolver = resolver_of(Arc::new(BurstProvider));
        let limits = StreamLimits {
            max_messages: 100,
            deadline: Duration::from_secs(10),
            poll_interval: Duration::from_secs(3),
        };
        // 容量1的通道 + 不消费的接收端：第二个数据帧的send会阻塞
        let (tx, mut rx) = mpsc::channel(1);
        let started = tokio::time::Instant::now();
        let task = tokio::spawn(run_stream(resolver, ListParams { limit: 50, since: None }, limits, tx));

        // 接收端保持存活但一帧都不读，截止时间必须仍能关闭循环
        task.await.unwrap();
        assert!(started.elapsed() >= limits.deadline);

        let mut data_count = 0;
        while let Ok(frame) = rx.try_recv() {
            if matches!(frame, StreamFrame::Data(_)) {
                data_count += 1;
            }
        }
        // 只有塞进通道缓冲的那一帧
        assert_eq!(data_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_respects_since_watermark() {
        let resolver = resolver_of(Arc::new(TickingProvider {
            counter: AtomicI64::new(0),
        }));
        // since晚于TickingProvider发出的所有时间戳 → 只有心跳
        let since = DateTime::from_timestamp_millis(1_760_000_000_000).unwrap();
        let limits = StreamLimits {
            max_messages: 10,
            deadline: Duration::from_secs(7),
            poll_interval: Duration::from_secs(3),
        };
        let (tx, rx) = mpsc::channel(32);
        let task = tokio::spawn(run_stream(
            resolver,
            ListParams {
                limit: 5,
                since: Some(since),
            },
            limits,
            tx,
        ));

        let frames = collect_frames(rx).await;
        task.await.unwrap();

        assert!(frames.iter().all(|f| !matches!(f, StreamFrame::Data(_))));
    }
}
