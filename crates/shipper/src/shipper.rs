//! 전송 엔진 -- 필터, 큐, 버퍼, 스케줄러, 재시도를 하나로 묶는 조립 루트
//!
//! [`Shipper`]는 `Arc` 내부 상태를 공유하는 가벼운 `Clone` 핸들입니다.
//!
//! # 내부 아키텍처
//! ```text
//! send(log) -> FilterPipeline -> QueueAdapter::push -> LogBuffer (tail)
//!
//! scheduler (interval) -> flush cycle:
//!   LogBuffer (head, <= LOG_LIMIT) -> RetryExecutor -> OutputHandler
//!     -> 성공: QueueAdapter::remove(batch)
//!     -> 소진: abandoned 목록 + ShipperReport::RetryExhausted
//!     -> 중단: LogBuffer (head)로 되돌림
//! ```
//!
//! # 동시성
//! - 초기화 게이트(`RwLock<bool>`): `send`는 공유 잠금, 시작 시 복구 목록 조회는
//!   배타 잠금을 잡습니다. 어떤 항목도 복구 목록과 `send` 양쪽에서 버퍼에 들어가지 않습니다.
//! - 플러시 게이트(`Mutex<()>`): 플러시 사이클은 한 번에 하나만 실행됩니다.
//!   타이머 틱은 게이트가 잡혀 있으면 건너뛰고, `flush_now`는 기다립니다.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use metrics::{counter, gauge};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use logship_core::metrics as m;
use logship_core::pipeline::HealthStatus;
use logship_core::types::LogRecord;

use crate::buffer::LogBuffer;
use crate::config::{LOG_LIMIT, ShipperConfig, StopPolicy};
use crate::error::ShipperError;
use crate::filter::{Filter, FilterPipeline};
use crate::output::OutputHandler;
use crate::queue::{ItemId, QueueAdapter, QueueItem};
use crate::retry::{RetryError, RetryExecutor, RetryPolicy};

/// 기본 리포트 채널 용량
const DEFAULT_REPORT_CHANNEL_CAPACITY: usize = 256;

/// 기본 abandoned ID 보관 한도
const DEFAULT_ABANDONED_LIMIT: usize = 10_000;

/// 호스트에 전달되는 비동기 실패 리포트
///
/// 플러시는 호출자가 기다리지 않는 백그라운드 작업이므로,
/// 실패는 에러 반환 대신 이 채널로 알립니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShipperReport {
    /// 재시도 소진으로 배치를 포기함 (항목은 큐에 남아 있음)
    RetryExhausted {
        /// 포기된 항목 ID
        items: Vec<ItemId>,
        /// 싱크 호출 횟수
        attempts: u32,
        /// 마지막 전달 에러
        error: String,
    },
    /// 전달은 성공했지만 큐에서 제거하지 못함 (재시작 시 중복 전달될 수 있음)
    RemoveFailed {
        /// 제거하지 못한 항목 ID
        items: Vec<ItemId>,
        /// 큐 에러
        error: String,
    },
}

/// 플러시 사이클 한 번의 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// 버퍼가 비어 있어 아무것도 하지 않음
    Empty,
    /// 배치 전달 및 큐 제거 완료
    Delivered { count: usize, attempts: u32 },
    /// 재시도 소진, 배치는 abandoned 목록으로 이동
    Exhausted { count: usize, attempts: u32 },
    /// 정지로 중단됨, 배치는 버퍼 앞쪽으로 복귀
    Aborted { count: usize },
    /// 다른 플러시가 진행 중이라 틱을 건너뜀
    Skipped,
}

/// 엔진 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShipperStats {
    /// 큐에 영속화된 로그 수
    pub logs_sent: u64,
    /// 전달 완료된 배치 수
    pub batches_delivered: u64,
    /// 전달 완료된 로그 수
    pub logs_delivered: u64,
    /// 재시도 소진으로 포기된 배치 수
    pub batches_exhausted: u64,
    /// 정지로 중단된 배치 수
    pub batches_aborted: u64,
    /// 건너뛴 타이머 틱 수
    pub skipped_ticks: u64,
    /// 전달 후 큐 제거 실패 수
    pub remove_failures: u64,
}

#[derive(Default)]
struct Counters {
    logs_sent: AtomicU64,
    batches_delivered: AtomicU64,
    logs_delivered: AtomicU64,
    batches_exhausted: AtomicU64,
    batches_aborted: AtomicU64,
    skipped_ticks: AtomicU64,
    remove_failures: AtomicU64,
}

/// 엔진 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShipperState {
    /// 생성됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지 중, 진행 중인 사이클을 기다림
    Stopping,
    /// 정지됨
    Stopped,
}

/// 실행 한 번에 속하는 취소 토큰 쌍
#[derive(Clone)]
struct RunTokens {
    /// 스케줄러와 대기 중인 틱을 멈춤
    timer: CancellationToken,
    /// 진행 중인 재시도 시퀀스를 멈춤 (`StopPolicy::Abort`에서만 취소)
    delivery: CancellationToken,
}

impl RunTokens {
    fn new() -> Self {
        Self {
            timer: CancellationToken::new(),
            delivery: CancellationToken::new(),
        }
    }
}

struct Lifecycle {
    state: ShipperState,
    tokens: Option<RunTokens>,
    scheduler: Option<JoinHandle<()>>,
}

struct Inner<Q: QueueAdapter> {
    config: ShipperConfig,
    queue: Arc<Q>,
    retry: RetryExecutor,
    filters: RwLock<FilterPipeline>,
    output: RwLock<Option<Arc<dyn OutputHandler>>>,
    /// 버퍼가 큐 목록으로 초기화되었는지 여부
    init: tokio::sync::RwLock<bool>,
    buffer: Mutex<LogBuffer>,
    /// 포기된 항목 ID (오래된 순). 내용은 큐에만 있음
    abandoned: Mutex<VecDeque<ItemId>>,
    abandoned_limit: usize,
    flush_gate: Mutex<()>,
    lifecycle: Mutex<Lifecycle>,
    running: AtomicBool,
    report_tx: mpsc::Sender<ShipperReport>,
    counters: Counters,
}

/// 로그 전송 엔진
///
/// # 사용 예시
/// ```ignore
/// use logship_shipper::{MemoryQueue, ShipperBuilder};
///
/// let (shipper, report_rx) = ShipperBuilder::new()
///     .config(config)
///     .queue(Arc::new(MemoryQueue::new()))
///     .build()?;
///
/// shipper.add_output(|logs: Vec<LogRecord>| async move { upload(logs).await });
/// shipper.start().await?;
/// shipper.send(LogRecord::new().with("msg", "hello")).await?;
/// ```
pub struct Shipper<Q: QueueAdapter> {
    inner: Arc<Inner<Q>>,
}

impl<Q: QueueAdapter> Clone for Shipper<Q> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Q: QueueAdapter> Shipper<Q> {
    /// 필터를 파이프라인 끝에 추가합니다. 추가된 필터는 제거할 수 없습니다.
    pub fn add_filter(&self, filter: impl Filter + 'static) {
        self.inner
            .filters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(filter);
    }

    /// 출력 핸들러를 등록합니다.
    ///
    /// 핸들러는 최대 하나입니다. 이미 등록된 핸들러가 있으면 교체하고 `true`를
    /// 반환합니다. 실행 중에도 교체할 수 있으며, 진행 중인 플러시 사이클은 시작할 때의
    /// 핸들러를 계속 사용하고 다음 사이클부터 새 핸들러가 쓰입니다.
    pub fn add_output(&self, handler: impl OutputHandler + 'static) -> bool {
        let replaced = self
            .inner
            .output
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::new(handler))
            .is_some();
        if replaced {
            info!("output handler replaced");
        }
        replaced
    }

    /// 엔진을 시작합니다.
    ///
    /// 처음 시작할 때 큐의 전체 목록으로 버퍼를 초기화하고, 플러시 스케줄러를
    /// 스폰합니다. 첫 플러시는 즉시 실행되고 이후 `flush_interval`마다 실행됩니다.
    /// 정지 후 재시작할 때는 큐를 다시 조회하지 않습니다.
    ///
    /// # Errors
    ///
    /// - `ShipperError::AlreadyRunning`: 이미 실행 중
    /// - `ShipperError::NoOutput`: 출력 핸들러가 없음
    /// - `ShipperError::Queue`: 복구 목록 조회 실패 (엔진은 정지 상태 유지)
    pub async fn start(&self) -> Result<(), ShipperError> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        match lifecycle.state {
            ShipperState::Running => return Err(ShipperError::AlreadyRunning),
            ShipperState::Stopping => return Err(ShipperError::Stopping),
            ShipperState::Initialized | ShipperState::Stopped => {}
        }
        if self.output_snapshot().is_none() {
            return Err(ShipperError::NoOutput);
        }

        info!("starting shipper");

        {
            let mut initialized = self.inner.init.write().await;
            if !*initialized {
                let items = self.inner.queue.list().await?;
                let recovered = items.len();
                let mut buffer = self.inner.buffer.lock().await;
                buffer.restore(items);
                gauge!(m::SHIPPER_BUFFER_SIZE).set(buffer.len() as f64);
                *initialized = true;
                info!(recovered, "buffer initialized from queue");
            }
        }

        let tokens = RunTokens::new();
        let scheduler = tokio::spawn(self.clone().run_scheduler(tokens.clone()));

        lifecycle.tokens = Some(tokens);
        lifecycle.scheduler = Some(scheduler);
        lifecycle.state = ShipperState::Running;
        self.inner.running.store(true, Ordering::Release);

        info!(
            flush_interval_ms =
                u64::try_from(self.inner.config.flush_interval.as_millis()).unwrap_or(u64::MAX),
            max_retry = self.inner.config.max_retry,
            "shipper started"
        );
        Ok(())
    }

    /// 로그 하나를 전송 대기열에 넣습니다.
    ///
    /// 필터를 적용한 뒤 큐에 영속화하고 버퍼 꼬리에 추가합니다.
    /// 첫 `start()` 이전에는 영속화만 하며, 시작 시 복구 목록에서 버퍼로 들어갑니다.
    ///
    /// # Errors
    ///
    /// - `ShipperError::Filter`: 필터가 로그를 거부함 (아무것도 영속화되지 않음)
    /// - `ShipperError::Queue`: 영속화 실패 (아무것도 버퍼에 들어가지 않음)
    pub async fn send(&self, log: LogRecord) -> Result<ItemId, ShipperError> {
        let log = {
            let filters = self
                .inner
                .filters
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            filters.apply(log)?
        };

        let initialized = self.inner.init.read().await;
        let item = self.inner.queue.push(log).await?;
        let id = item.id;

        if *initialized {
            let mut buffer = self.inner.buffer.lock().await;
            buffer.push(item);
            gauge!(m::SHIPPER_BUFFER_SIZE).set(buffer.len() as f64);
        }
        drop(initialized);

        self.inner.counters.logs_sent.fetch_add(1, Ordering::Relaxed);
        counter!(m::SHIPPER_LOGS_SENT_TOTAL).increment(1);
        Ok(id)
    }

    /// 플러시 사이클을 즉시 한 번 실행합니다.
    ///
    /// 다른 사이클이 진행 중이면 끝날 때까지 기다립니다.
    ///
    /// # Errors
    ///
    /// - `ShipperError::NotRunning`: 실행 중이 아님
    /// - `ShipperError::Queue`: 전달 후 큐 제거 실패
    pub async fn flush_now(&self) -> Result<FlushOutcome, ShipperError> {
        let tokens = self
            .inner
            .lifecycle
            .lock()
            .await
            .tokens
            .clone()
            .ok_or(ShipperError::NotRunning)?;

        let _gate = self.inner.flush_gate.lock().await;
        if tokens.timer.is_cancelled() {
            return Err(ShipperError::NotRunning);
        }
        self.flush_locked(&tokens.delivery).await
    }

    /// 엔진을 정지합니다.
    ///
    /// 스케줄러를 멈추고, 진행 중인 플러시 사이클은 [`StopPolicy`]에 따라 처리합니다.
    /// - `Abort`: 재시도를 다음 대기 지점에서 중단하고 배치를 버퍼 앞쪽으로 되돌립니다.
    /// - `Drain`: 진행 중인 사이클이 성공하거나 소진될 때까지 기다립니다.
    ///
    /// 어느 경우든 버퍼의 항목은 큐에 남아 있습니다.
    ///
    /// # Errors
    ///
    /// 실행 중이 아니면 `ShipperError::NotRunning`을 반환합니다.
    pub async fn stop(&self) -> Result<(), ShipperError> {
        let (tokens, scheduler) = {
            let mut lifecycle = self.inner.lifecycle.lock().await;
            if lifecycle.state != ShipperState::Running {
                return Err(ShipperError::NotRunning);
            }
            lifecycle.state = ShipperState::Stopping;
            (lifecycle.tokens.take(), lifecycle.scheduler.take())
        };

        let policy = self.inner.config.stop_policy;
        info!(?policy, "stopping shipper");

        if let Some(tokens) = tokens {
            tokens.timer.cancel();
            if policy == StopPolicy::Abort {
                tokens.delivery.cancel();
            }
        }

        // 대기하는 동안 lifecycle 잠금을 잡지 않음
        if let Some(scheduler) = scheduler {
            if let Err(e) = scheduler.await {
                warn!(error = %e, "flush scheduler task ended abnormally");
            }
        }
        drop(self.inner.flush_gate.lock().await);

        self.inner.lifecycle.lock().await.state = ShipperState::Stopped;
        self.inner.running.store(false, Ordering::Release);

        let buffered = self.inner.buffer.lock().await.len();
        info!(buffered, "shipper stopped");
        Ok(())
    }

    /// 포기된 배치를 버퍼 앞쪽으로 되돌립니다. 되돌린 항목 수를 반환합니다.
    ///
    /// 포기 목록에는 ID만 있으므로 내용은 큐 목록에서 다시 읽습니다. 그 사이 큐에서
    /// 사라진 항목은 건너뜁니다. 포기된 항목은 현재 버퍼의 어떤 항목보다
    /// 오래되었으므로 앞에 둡니다.
    ///
    /// # Errors
    ///
    /// 큐 목록 조회에 실패하면 `ShipperError::Queue`를 반환하고 포기 목록은 그대로 둡니다.
    pub async fn recover_abandoned(&self) -> Result<usize, ShipperError> {
        let mut abandoned = self.inner.abandoned.lock().await;
        if abandoned.is_empty() {
            return Ok(0);
        }

        let ids: HashSet<ItemId> = abandoned.iter().copied().collect();
        let items: Vec<QueueItem> = self
            .inner
            .queue
            .list()
            .await?
            .into_iter()
            .filter(|item| ids.contains(&item.id))
            .collect();

        let missing = ids.len() - items.len();
        abandoned.clear();
        gauge!(m::SHIPPER_ABANDONED_SIZE).set(0.0);
        drop(abandoned);

        if missing > 0 {
            debug!(missing, "abandoned items no longer in queue");
        }

        let count = items.len();
        let mut buffer = self.inner.buffer.lock().await;
        buffer.requeue_front(items);
        gauge!(m::SHIPPER_BUFFER_SIZE).set(buffer.len() as f64);

        info!(count, "recovered abandoned items into buffer");
        Ok(count)
    }

    /// 엔진 상태를 확인합니다.
    ///
    /// 실행 중이어도 포기된 배치가 남아 있으면 `Degraded`입니다.
    pub async fn health_check(&self) -> HealthStatus {
        let state = self.inner.lifecycle.lock().await.state;
        match state {
            ShipperState::Running => {
                let abandoned = self.abandoned_len().await;
                if abandoned > 0 {
                    HealthStatus::Degraded(format!("{abandoned} abandoned items awaiting recovery"))
                } else {
                    HealthStatus::Healthy
                }
            }
            ShipperState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            ShipperState::Stopping => HealthStatus::Unhealthy("stopping".to_owned()),
            ShipperState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }

    /// 통계 스냅샷을 반환합니다.
    pub fn stats(&self) -> ShipperStats {
        let c = &self.inner.counters;
        ShipperStats {
            logs_sent: c.logs_sent.load(Ordering::Relaxed),
            batches_delivered: c.batches_delivered.load(Ordering::Relaxed),
            logs_delivered: c.logs_delivered.load(Ordering::Relaxed),
            batches_exhausted: c.batches_exhausted.load(Ordering::Relaxed),
            batches_aborted: c.batches_aborted.load(Ordering::Relaxed),
            skipped_ticks: c.skipped_ticks.load(Ordering::Relaxed),
            remove_failures: c.remove_failures.load(Ordering::Relaxed),
        }
    }

    /// 버퍼에 있는 항목 수
    pub async fn buffered_len(&self) -> usize {
        self.inner.buffer.lock().await.len()
    }

    /// 버퍼 내용의 로그 복사본 (머리부터)
    pub async fn buffered_logs(&self) -> Vec<LogRecord> {
        self.inner.buffer.lock().await.snapshot()
    }

    /// 포기된 항목 수
    pub async fn abandoned_len(&self) -> usize {
        self.inner.abandoned.lock().await.len()
    }

    /// 실행 중인지 확인합니다.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// 엔진 설정
    pub fn config(&self) -> &ShipperConfig {
        &self.inner.config
    }

    /// 큐 어댑터
    pub fn queue(&self) -> &Arc<Q> {
        &self.inner.queue
    }

    fn output_snapshot(&self) -> Option<Arc<dyn OutputHandler>> {
        self.inner
            .output
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn run_scheduler(self, tokens: RunTokens) {
        let mut flush = tokio::time::interval(self.inner.config.flush_interval);
        flush.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut recheck = self.inner.config.abandoned_recheck_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        loop {
            tokio::select! {
                biased;
                () = tokens.timer.cancelled() => break,
                _ = flush.tick() => self.spawn_tick(tokens.clone()),
                _ = next_tick(&mut recheck) => {
                    if let Err(e) = self.recover_abandoned().await {
                        warn!(error = %e, "abandoned recovery failed, will retry on next recheck");
                    }
                }
            }
        }

        debug!("flush scheduler stopped");
    }

    /// 틱마다 플러시 사이클을 별도 태스크로 실행합니다.
    ///
    /// 스케줄러가 느린 사이클에 막히지 않고 고정 주기를 유지합니다.
    fn spawn_tick(&self, tokens: RunTokens) {
        let shipper = self.clone();
        tokio::spawn(async move {
            if tokens.timer.is_cancelled() {
                return;
            }
            let Ok(_gate) = shipper.inner.flush_gate.try_lock() else {
                shipper
                    .inner
                    .counters
                    .skipped_ticks
                    .fetch_add(1, Ordering::Relaxed);
                counter!(m::SHIPPER_FLUSH_SKIPPED_TOTAL).increment(1);
                debug!(outcome = ?FlushOutcome::Skipped, "flush in progress, skipping tick");
                return;
            };
            // 게이트를 기다리는 동안 정지되었을 수 있음
            if tokens.timer.is_cancelled() {
                return;
            }
            match shipper.flush_locked(&tokens.delivery).await {
                Ok(outcome) => debug!(?outcome, "flush cycle finished"),
                Err(e) => warn!(error = %e, "flush cycle failed"),
            }
        });
    }

    /// 플러시 사이클 본체. 호출자는 플러시 게이트를 잡고 있어야 합니다.
    async fn flush_locked(&self, cancel: &CancellationToken) -> Result<FlushOutcome, ShipperError> {
        let handler = self.output_snapshot().ok_or(ShipperError::NoOutput)?;

        let batch = {
            let mut buffer = self.inner.buffer.lock().await;
            let batch = buffer.drain_batch(LOG_LIMIT);
            gauge!(m::SHIPPER_BUFFER_SIZE).set(buffer.len() as f64);
            batch
        };
        if batch.is_empty() {
            return Ok(FlushOutcome::Empty);
        }

        let count = batch.len();
        let logs: Vec<LogRecord> = batch.iter().map(|item| item.log.clone()).collect();
        debug!(count, "flushing batch");

        match self.inner.retry.deliver(handler.as_ref(), &logs, cancel).await {
            Ok(attempts) => {
                if let Err(e) = self.inner.queue.remove(&batch).await {
                    self.inner
                        .counters
                        .remove_failures
                        .fetch_add(1, Ordering::Relaxed);
                    error!(count, error = %e, "failed to remove delivered items from queue");
                    self.report(ShipperReport::RemoveFailed {
                        items: batch.iter().map(|item| item.id).collect(),
                        error: e.to_string(),
                    });
                    return Err(e.into());
                }

                let c = &self.inner.counters;
                c.batches_delivered.fetch_add(1, Ordering::Relaxed);
                c.logs_delivered.fetch_add(count as u64, Ordering::Relaxed);
                counter!(m::SHIPPER_BATCHES_DELIVERED_TOTAL).increment(1);
                counter!(m::SHIPPER_LOGS_DELIVERED_TOTAL).increment(count as u64);
                Ok(FlushOutcome::Delivered { count, attempts })
            }
            Err(RetryError::Exhausted {
                attempts,
                last_error,
            }) => {
                error!(
                    count,
                    attempts,
                    error = %last_error,
                    "retries exhausted, abandoning batch until recovery"
                );
                let items: Vec<ItemId> = batch.iter().map(|item| item.id).collect();
                self.abandon(&items).await;
                self.inner
                    .counters
                    .batches_exhausted
                    .fetch_add(1, Ordering::Relaxed);
                counter!(m::SHIPPER_BATCHES_EXHAUSTED_TOTAL).increment(1);
                self.report(ShipperReport::RetryExhausted {
                    items,
                    attempts,
                    error: last_error.to_string(),
                });
                Ok(FlushOutcome::Exhausted { count, attempts })
            }
            Err(RetryError::Aborted { attempts }) => {
                let mut buffer = self.inner.buffer.lock().await;
                buffer.requeue_front(batch);
                gauge!(m::SHIPPER_BUFFER_SIZE).set(buffer.len() as f64);
                self.inner
                    .counters
                    .batches_aborted
                    .fetch_add(1, Ordering::Relaxed);
                info!(count, attempts, "in-flight delivery aborted, batch returned to buffer");
                Ok(FlushOutcome::Aborted { count })
            }
        }
    }

    /// 포기된 ID를 기록합니다. 한도를 넘으면 가장 오래된 ID부터 잊습니다.
    ///
    /// 잊힌 항목도 큐에는 남아 있어 다음 프로세스 시작 시 복구됩니다.
    async fn abandon(&self, ids: &[ItemId]) {
        let mut abandoned = self.inner.abandoned.lock().await;
        abandoned.extend(ids.iter().copied());

        let overflow = abandoned.len().saturating_sub(self.inner.abandoned_limit);
        if overflow > 0 {
            abandoned.drain(..overflow);
            warn!(
                forgotten = overflow,
                limit = self.inner.abandoned_limit,
                "abandoned list full, oldest items left for the next process start"
            );
        }
        gauge!(m::SHIPPER_ABANDONED_SIZE).set(abandoned.len() as f64);
    }

    fn report(&self, report: ShipperReport) {
        if let Err(e) = self.inner.report_tx.try_send(report) {
            warn!(error = %e, "failed to publish shipper report");
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) -> Instant {
    match interval {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}

/// 전송 엔진 빌더
///
/// 엔진을 구성하고 리포트 채널을 생성합니다.
pub struct ShipperBuilder<Q: QueueAdapter> {
    config: ShipperConfig,
    queue: Option<Arc<Q>>,
    report_tx: Option<mpsc::Sender<ShipperReport>>,
    report_channel_capacity: usize,
    abandoned_limit: usize,
}

impl<Q: QueueAdapter> ShipperBuilder<Q> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: ShipperConfig::default(),
            queue: None,
            report_tx: None,
            report_channel_capacity: DEFAULT_REPORT_CHANNEL_CAPACITY,
            abandoned_limit: DEFAULT_ABANDONED_LIMIT,
        }
    }

    /// 엔진 설정을 지정합니다.
    pub fn config(mut self, config: ShipperConfig) -> Self {
        self.config = config;
        self
    }

    /// 큐 어댑터를 지정합니다 (필수).
    pub fn queue(mut self, queue: Arc<Q>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// 외부 리포트 전송 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다.
    pub fn report_sender(mut self, tx: mpsc::Sender<ShipperReport>) -> Self {
        self.report_tx = Some(tx);
        self
    }

    /// 리포트 채널 용량을 설정합니다 (외부 채널 미사용 시).
    pub fn report_channel_capacity(mut self, capacity: usize) -> Self {
        self.report_channel_capacity = capacity;
        self
    }

    /// 메모리에 보관할 포기된 항목 ID 수의 상한을 설정합니다.
    ///
    /// 한도를 넘은 항목은 `recover_abandoned`로 되돌릴 수 없지만 큐에는 남습니다.
    pub fn abandoned_limit(mut self, limit: usize) -> Self {
        self.abandoned_limit = limit;
        self
    }

    /// 엔진을 빌드합니다.
    ///
    /// # Returns
    /// - `Shipper`: 엔진 핸들
    /// - `Option<mpsc::Receiver<ShipperReport>>`: 리포트 수신 채널
    ///   (외부 report_sender를 설정한 경우 None)
    pub fn build(
        self,
    ) -> Result<(Shipper<Q>, Option<mpsc::Receiver<ShipperReport>>), ShipperError> {
        self.config.validate()?;

        let queue = self.queue.ok_or_else(|| ShipperError::Config {
            field: "queue".to_owned(),
            reason: "a queue adapter is required".to_owned(),
        })?;

        if self.report_tx.is_none() && self.report_channel_capacity == 0 {
            return Err(ShipperError::Config {
                field: "report_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        let (report_tx, report_rx) = if let Some(tx) = self.report_tx {
            (tx, None)
        } else {
            let (tx, rx) = mpsc::channel(self.report_channel_capacity);
            (tx, Some(rx))
        };

        let inner = Inner {
            retry: RetryExecutor::new(RetryPolicy::from(&self.config)),
            config: self.config,
            queue,
            filters: RwLock::new(FilterPipeline::new()),
            output: RwLock::new(None),
            init: tokio::sync::RwLock::new(false),
            buffer: Mutex::new(LogBuffer::new()),
            abandoned: Mutex::new(VecDeque::new()),
            abandoned_limit: self.abandoned_limit,
            flush_gate: Mutex::new(()),
            lifecycle: Mutex::new(Lifecycle {
                state: ShipperState::Initialized,
                tokens: None,
                scheduler: None,
            }),
            running: AtomicBool::new(false),
            report_tx,
            counters: Counters::default(),
        };

        Ok((
            Shipper {
                inner: Arc::new(inner),
            },
            report_rx,
        ))
    }
}

impl<Q: QueueAdapter> Default for ShipperBuilder<Q> {
    fn default() -> Self {
        Self::new()
    }
}
