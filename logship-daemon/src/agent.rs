//! Agent -- assembly of queue, filters, sink and shipper, plus the stdin ingest loop.
//!
//! The [`Agent`] is the central coordinator of `logship-daemon`.
//! It validates configuration, opens the configured queue, registers the
//! configured filters and output sink, and runs the ingest loop until the
//! input reaches EOF or a shutdown signal arrives.
//!
//! # Lifecycle
//!
//! 1. Build: open queue, build shipper, register filters and sink
//! 2. Run: start shipper (recovers queued items), spawn report logger,
//!    read input lines and `send` each JSON object
//! 3. Shutdown: on EOF drain the buffer with manual flushes, then stop the shipper
//!    (on a signal, stop immediately; unflushed items stay in the queue)

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use logship_core::config::{FiltersConfig, LogshipConfig, QueueConfig};
use logship_core::error::QueueError;
use logship_core::types::LogRecord;
use logship_shipper::{
    AddFields, DropFields, FileQueue, FlushOutcome, MemoryQueue, QueueAdapter, QueueItem, Shipper,
    ShipperBuilder, ShipperConfig, ShipperError, ShipperReport,
};

use crate::sink::JsonLinesSink;

/// Queue selected by `[queue] kind`.
pub enum DaemonQueue {
    /// Non-durable in-memory queue.
    Memory(MemoryQueue),
    /// Durable JSON lines file queue.
    File(FileQueue),
}

impl DaemonQueue {
    /// Open the queue described by the config.
    pub async fn open(config: &QueueConfig) -> Result<Self> {
        match config.kind.as_str() {
            "memory" => Ok(Self::Memory(MemoryQueue::new())),
            "file" => {
                let queue = FileQueue::open(&config.path).await.map_err(|e| {
                    anyhow::anyhow!("failed to open file queue {}: {}", config.path, e)
                })?;
                Ok(Self::File(queue))
            }
            other => Err(anyhow::anyhow!(
                "unknown queue kind '{}', expected 'memory' or 'file'",
                other
            )),
        }
    }
}

impl QueueAdapter for DaemonQueue {
    async fn push(&self, log: LogRecord) -> Result<QueueItem, QueueError> {
        match self {
            Self::Memory(queue) => queue.push(log).await,
            Self::File(queue) => queue.push(log).await,
        }
    }

    async fn list(&self) -> Result<Vec<QueueItem>, QueueError> {
        match self {
            Self::Memory(queue) => queue.list().await,
            Self::File(queue) => queue.list().await,
        }
    }

    async fn remove(&self, items: &[QueueItem]) -> Result<(), QueueError> {
        match self {
            Self::Memory(queue) => queue.remove(items).await,
            Self::File(queue) => queue.remove(items).await,
        }
    }
}

/// Counters for one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Lines persisted through `send`.
    pub accepted: u64,
    /// Lines that were not JSON objects.
    pub invalid: u64,
    /// Lines rejected by a filter.
    pub rejected: u64,
    /// Lines that failed to persist.
    pub failed: u64,
}

/// Why the ingest loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Eof,
    Signal,
}

/// The daemon agent.
pub struct Agent {
    config: LogshipConfig,
    shipper: Shipper<DaemonQueue>,
    report_rx: Option<mpsc::Receiver<ShipperReport>>,
}

impl Agent {
    /// Load configuration from a file and build the agent.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = LogshipConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    pub async fn build_from_config(config: LogshipConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        let shipper_config = ShipperConfig::from_core(&config.shipper)
            .map_err(|e| anyhow::anyhow!("invalid shipper config: {}", e))?;

        let queue = Arc::new(DaemonQueue::open(&config.queue).await?);
        tracing::info!(kind = %config.queue.kind, "queue opened");

        let (shipper, report_rx) = ShipperBuilder::new()
            .config(shipper_config)
            .queue(queue)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build shipper: {}", e))?;

        register_filters(&shipper, &config.filters);

        match config.output.kind.as_str() {
            "stdout" => {
                shipper.add_output(JsonLinesSink::stdout());
            }
            "file" => {
                let sink = JsonLinesSink::file(&config.output.path).await.map_err(|e| {
                    anyhow::anyhow!("failed to open output file {}: {}", config.output.path, e)
                })?;
                shipper.add_output(sink);
            }
            other => {
                return Err(anyhow::anyhow!(
                    "unknown output kind '{}', expected 'stdout' or 'file'",
                    other
                ));
            }
        }
        tracing::info!(kind = %config.output.kind, "output sink registered");

        Ok(Self {
            config,
            shipper,
            report_rx,
        })
    }

    /// Run until `input` reaches EOF or `shutdown` resolves.
    ///
    /// Each input line must be a JSON object. Invalid lines and lines
    /// rejected by a filter are logged and skipped.
    pub async fn run<R, S>(&mut self, input: R, shutdown: S) -> Result<IngestStats>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        self.shipper
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start shipper: {}", e))?;

        let report_logger = self.report_rx.take().map(spawn_report_logger);

        let mut stats = IngestStats::default();
        let mut lines = input.lines();
        tokio::pin!(shutdown);

        tracing::info!("reading newline-delimited JSON from input");
        let reason = loop {
            tokio::select! {
                () = &mut shutdown => break StopReason::Signal,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => self.ingest_line(&line, &mut stats).await,
                    Ok(None) => break StopReason::Eof,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to read input");
                        break StopReason::Eof;
                    }
                },
            }
        };
        tracing::info!(
            reason = ?reason,
            accepted = stats.accepted,
            invalid = stats.invalid,
            rejected = stats.rejected,
            failed = stats.failed,
            "input finished"
        );

        if reason == StopReason::Eof {
            self.drain().await;
        }

        self.shipper
            .stop()
            .await
            .map_err(|e| anyhow::anyhow!("failed to stop shipper: {}", e))?;

        if let Some(task) = report_logger {
            task.abort();
            let _ = task.await;
        }

        Ok(stats)
    }

    /// Flush until the buffer is empty or a flush stops making progress.
    async fn drain(&self) {
        loop {
            match self.shipper.flush_now().await {
                Ok(FlushOutcome::Delivered { .. }) => continue,
                Ok(outcome) => {
                    tracing::debug!(?outcome, "drain finished");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "drain stopped early");
                    break;
                }
            }
        }

        let remaining = self.shipper.buffered_len().await + self.shipper.abandoned_len().await;
        if remaining > 0 {
            tracing::warn!(
                remaining,
                queue = %self.config.queue.kind,
                "undelivered logs remain in the queue"
            );
        }
    }

    async fn ingest_line(&self, line: &str, stats: &mut IngestStats) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let record = match serde_json::from_str::<serde_json::Value>(line)
            .map_err(|e| e.to_string())
            .and_then(|value| {
                LogRecord::from_value(value).map_err(|_| "not a JSON object".to_owned())
            }) {
            Ok(record) => record,
            Err(reason) => {
                stats.invalid += 1;
                tracing::warn!(reason = %reason, "skipping invalid input line");
                return;
            }
        };

        match self.shipper.send(record).await {
            Ok(_) => stats.accepted += 1,
            Err(ShipperError::Filter(e)) => {
                stats.rejected += 1;
                tracing::debug!(error = %e, "log rejected by filter");
            }
            Err(e) => {
                stats.failed += 1;
                tracing::error!(error = %e, "failed to persist log");
            }
        }
    }

    /// The underlying shipper.
    pub fn shipper(&self) -> &Shipper<DaemonQueue> {
        &self.shipper
    }

    /// The loaded configuration.
    pub fn config(&self) -> &LogshipConfig {
        &self.config
    }
}

/// Register `[filters]`: drop listed fields first, then add static fields.
fn register_filters(shipper: &Shipper<DaemonQueue>, filters: &FiltersConfig) {
    if !filters.drop_fields.is_empty() {
        shipper.add_filter(DropFields::new(filters.drop_fields.iter().cloned()));
    }
    if !filters.add_fields.is_empty() {
        shipper.add_filter(AddFields::new(
            filters
                .add_fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        ));
    }
    tracing::debug!(
        drop_fields = filters.drop_fields.len(),
        add_fields = filters.add_fields.len(),
        "filters registered"
    );
}

/// Log shipper reports until the channel closes or the task is aborted.
fn spawn_report_logger(mut rx: mpsc::Receiver<ShipperReport>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(report) = rx.recv().await {
            match report {
                ShipperReport::RetryExhausted {
                    items,
                    attempts,
                    error,
                } => tracing::error!(
                    items = items.len(),
                    attempts,
                    error = %error,
                    "batch abandoned after exhausting retries"
                ),
                ShipperReport::RemoveFailed { items, error } => tracing::error!(
                    items = items.len(),
                    error = %error,
                    "delivered batch could not be removed from queue"
                ),
            }
        }
    })
}
