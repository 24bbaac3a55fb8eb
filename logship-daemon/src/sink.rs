//! Output sinks -- JSON lines writers used as the shipper's output handler.
//!
//! [`JsonLinesSink`] writes each delivered log as one compact JSON line
//! to an async writer and flushes once per batch. A batch is acknowledged
//! only after the whole batch has been written, flushed and, for files,
//! synced to disk.

use std::path::Path;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use logship_core::error::OutputError;
use logship_core::pipeline::BoxFuture;
use logship_core::types::LogRecord;
use logship_shipper::OutputHandler;

/// Writers that can persist flushed data to stable storage.
pub trait SyncToDisk {
    /// Persist written data. No-op for writers without a backing file.
    fn sync_to_disk(&mut self) -> BoxFuture<'_, std::io::Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

impl SyncToDisk for tokio::io::Stdout {}

impl SyncToDisk for Vec<u8> {}

impl SyncToDisk for tokio::fs::File {
    fn sync_to_disk(&mut self) -> BoxFuture<'_, std::io::Result<()>> {
        Box::pin(self.sync_data())
    }
}

/// JSON lines output sink over any async writer.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + SyncToDisk + Unpin + Send,
{
    /// Wrap an async writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the sink and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    async fn write_batch(&self, logs: &[LogRecord]) -> std::io::Result<()> {
        let mut buf = Vec::new();
        for log in logs {
            serde_json::to_writer(&mut buf, log)?;
            buf.push(b'\n');
        }

        let mut writer = self.writer.lock().await;
        writer.write_all(&buf).await?;
        writer.flush().await?;
        writer.sync_to_disk().await
    }
}

impl JsonLinesSink<tokio::io::Stdout> {
    /// Sink writing to the process stdout.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl JsonLinesSink<tokio::fs::File> {
    /// Sink appending to a file, created along with its parent directories if missing.
    pub async fn file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self::new(file))
    }
}

impl<W> OutputHandler for JsonLinesSink<W>
where
    W: AsyncWrite + SyncToDisk + Unpin + Send + 'static,
{
    fn deliver<'a>(&'a self, logs: &'a [LogRecord]) -> BoxFuture<'a, Result<(), OutputError>> {
        Box::pin(async move {
            self.write_batch(logs)
                .await
                .map_err(|e| OutputError::Delivery(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn parse_lines(bytes: &[u8]) -> Vec<Value> {
        std::str::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn writes_one_json_line_per_log_in_order() {
        let sink = JsonLinesSink::new(Vec::new());
        let batch = vec![
            LogRecord::new().with("n", 1),
            LogRecord::new().with("n", 2).with("msg", "two"),
        ];
        sink.deliver(&batch).await.unwrap();

        let out = sink.into_inner();
        assert!(out.ends_with(b"\n"));
        assert_eq!(
            parse_lines(&out),
            vec![json!({"n": 1}), json!({"n": 2, "msg": "two"})]
        );
    }

    #[tokio::test]
    async fn empty_batch_writes_nothing() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.deliver(&[]).await.unwrap();
        assert!(sink.into_inner().is_empty());
    }

    #[tokio::test]
    async fn file_sink_appends_across_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/shipped.jsonl");

        let sink = JsonLinesSink::file(&path).await.unwrap();
        sink.deliver(&[LogRecord::new().with("n", 1)]).await.unwrap();
        sink.deliver(&[LogRecord::new().with("n", 2)]).await.unwrap();
        drop(sink);

        let content = tokio::fs::read(&path).await.unwrap();
        assert_eq!(parse_lines(&content), vec![json!({"n": 1}), json!({"n": 2})]);
    }
}
