//! 파일 큐 -- JSON lines 추가 전용 로그 파일 기반 영속 큐
//!
//! 각 줄은 직렬화된 [`QueueItem`] 하나입니다.
//!
//! - `push`: 한 줄을 덧붙이고 `sync_data`로 디스크에 반영합니다.
//! - `list`: 파일 전체를 읽어 삽입 순서대로 반환합니다.
//! - `remove`: 제거 대상을 뺀 내용을 임시 파일에 쓰고 원자적으로 rename합니다.
//!
//! 쓰기 도중 프로세스가 죽어 마지막 줄이 잘린 경우, `open` 시 잘린 꼬리를 잘라내고
//! 경고를 남깁니다. `push`는 쓰기나 동기화에 실패하면 파일 길이를 쓰기 전으로
//! 되돌리고, 덧붙이기 전에 남아 있는 잘린 꼬리도 잘라냅니다.
//! 마지막이 아닌 줄이 손상된 경우에는 에러입니다.

use std::collections::HashSet;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use logship_core::error::QueueError;
use logship_core::types::LogRecord;

use super::{ItemId, QueueAdapter, QueueItem};

/// JSON lines 파일 기반 영속 큐
pub struct FileQueue {
    /// 큐 파일 경로
    path: PathBuf,
    /// 파일 연산 직렬화용 잠금
    lock: Mutex<()>,
}

impl FileQueue {
    /// 큐 파일을 열거나 새로 만듭니다.
    ///
    /// 상위 디렉토리가 없으면 생성하고, 잘린 마지막 줄이 있으면 잘라냅니다.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .await?;
        trim_torn_tail(&mut file, &path).await?;
        file.sync_all().await?;
        drop(file);

        debug!(path = %path.display(), "file queue opened");
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// 큐 파일 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_items(&self) -> Result<Vec<QueueItem>, QueueError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        parse_lines(&content)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

/// JSON lines 내용을 항목 목록으로 파싱합니다.
///
/// 개행으로 끝나지 않는 마지막 줄이 손상된 경우에만 건너뜁니다.
fn parse_lines(content: &str) -> Result<Vec<QueueItem>, QueueError> {
    let torn_tail_possible = !content.is_empty() && !content.ends_with('\n');
    let lines: Vec<&str> = content.lines().collect();
    let last_index = lines.len().saturating_sub(1);

    let mut items = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<QueueItem>(line) {
            Ok(item) => items.push(item),
            Err(e) if torn_tail_possible && index == last_index => {
                warn!(line = index + 1, error = %e, "skipping torn trailing queue record");
            }
            Err(e) => {
                return Err(QueueError::Corrupt {
                    line: index + 1,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(items)
}

/// 파일이 개행으로 끝나지 않으면 마지막 개행 뒤를 잘라냅니다. 유효한 길이를 반환합니다.
async fn trim_torn_tail(file: &mut File, path: &Path) -> Result<u64, QueueError> {
    let len = file.metadata().await?.len();
    if len == 0 {
        return Ok(0);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1)).await?;
    file.read_exact(&mut last).await?;
    if last[0] == b'\n' {
        return Ok(len);
    }

    let mut content = Vec::new();
    file.seek(SeekFrom::Start(0)).await?;
    file.read_to_end(&mut content).await?;
    let valid_len = content
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|pos| pos + 1)
        .unwrap_or(0);
    let valid_len = u64::try_from(valid_len).unwrap_or(len);

    warn!(
        path = %path.display(),
        truncated_bytes = len - valid_len,
        "truncating torn trailing record in queue file"
    );
    rollback_to(file, valid_len).await?;
    Ok(valid_len)
}

async fn append_synced(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await?;
    file.sync_data().await
}

async fn rollback_to(file: &File, len: u64) -> std::io::Result<()> {
    file.set_len(len).await?;
    file.sync_data().await
}

fn encode_line(item: &QueueItem) -> Result<Vec<u8>, QueueError> {
    let mut line = serde_json::to_vec(item).map_err(|e| QueueError::Corrupt {
        line: 0,
        reason: format!("failed to encode item {}: {e}", item.id),
    })?;
    line.push(b'\n');
    Ok(line)
}

impl QueueAdapter for FileQueue {
    async fn push(&self, log: LogRecord) -> Result<QueueItem, QueueError> {
        let item = QueueItem::new(log);
        let line = encode_line(&item)?;

        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.path)
            .await?;

        let len = trim_torn_tail(&mut file, &self.path).await?;
        file.seek(SeekFrom::Start(len)).await?;

        if let Err(e) = append_synced(&mut file, &line).await {
            // 일부만 기록된 줄이 다음 push 앞에 묻히지 않도록 되돌림
            if let Err(rollback) = rollback_to(&file, len).await {
                error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "failed to roll back partial queue record"
                );
            }
            return Err(e.into());
        }

        Ok(item)
    }

    async fn list(&self) -> Result<Vec<QueueItem>, QueueError> {
        let _guard = self.lock.lock().await;
        self.read_items().await
    }

    async fn remove(&self, items: &[QueueItem]) -> Result<(), QueueError> {
        if items.is_empty() {
            return Ok(());
        }
        let ids: HashSet<ItemId> = items.iter().map(|item| item.id).collect();

        let _guard = self.lock.lock().await;
        let current = self.read_items().await?;
        let kept: Vec<&QueueItem> = current
            .iter()
            .filter(|item| !ids.contains(&item.id))
            .collect();

        let mut buf = Vec::new();
        for item in &kept {
            buf.extend_from_slice(&encode_line(item)?);
        }

        let tmp_path = self.tmp_path();
        let mut tmp = tokio::fs::File::create(&tmp_path).await?;
        tmp.write_all(&buf).await?;
        tmp.sync_all().await?;
        drop(tmp);
        tokio::fs::rename(&tmp_path, &self.path).await?;

        debug!(
            requested = items.len(),
            removed = current.len() - kept.len(),
            "removed items from file queue"
        );
        Ok(())
    }
}
