//! 영속 큐 어댑터 -- 전달 확인 전까지 로그를 보관하는 저장소 계약
//!
//! 엔진은 [`QueueAdapter`]의 push/list/remove 계약에만 의존합니다.
//! 구체 저장소(디스크, 임베디드 DB 등)는 이 trait을 구현해 주입합니다.
//!
//! ```text
//!            QueueAdapter (trait)
//!             ┌──────┴──────┐
//!        MemoryQueue     FileQueue
//!        (비영속)        (JSON lines)
//! ```
//!
//! # 계약
//! - `push`: 로그 하나를 영속화하고, 나중에 제거할 때 쓸 핸들을 반환합니다.
//!   프로세스 재시작 후에도 남아 있어야 합니다.
//! - `list`: 아직 제거되지 않은 모든 항목을 삽입 순서대로 반환합니다.
//!   엔진 시작 시 복구용으로 한 번 호출됩니다.
//! - `remove`: 주어진 항목만 정확히 삭제합니다. 이미 삭제된 항목에 대해서는 no-op입니다.
//!
//! 하나의 큐 인스턴스에는 하나의 논리적 writer만 있다고 가정합니다.
//! 같은 클라이언트의 동시 push/list/remove 호출에 대한 일관성은 어댑터가 책임집니다.

pub mod file;
pub mod memory;

pub use file::FileQueue;
pub use memory::MemoryQueue;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use logship_core::error::QueueError;
use logship_core::types::LogRecord;

/// 영속화된 항목의 식별자
///
/// 큐 어댑터가 발급하며, 엔진은 제거 요청에만 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// 새 무작위 식별자를 발급합니다.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 큐에 영속화된 로그 항목
///
/// 큐 어댑터가 생성하고 소유합니다. 버퍼와 엔진은 `id`를 바꾸지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// 제거 시 사용하는 식별자
    pub id: ItemId,
    /// (필터가 적용된) 로그
    pub log: LogRecord,
}

impl QueueItem {
    /// 새 항목을 생성합니다.
    pub fn new(log: LogRecord) -> Self {
        Self {
            id: ItemId::new(),
            log,
        }
    }
}

/// 영속 큐 어댑터 trait
///
/// 프로덕션에서는 [`FileQueue`], 테스트나 임베딩 용도로는 [`MemoryQueue`]를 사용합니다.
pub trait QueueAdapter: Send + Sync + 'static {
    /// 로그 하나를 영속화합니다.
    ///
    /// # Errors
    ///
    /// 저장소에 기록하지 못하면 `QueueError`를 반환합니다.
    /// 이 경우 엔진은 해당 로그를 버퍼에 넣지 않습니다.
    fn push(&self, log: LogRecord) -> impl Future<Output = Result<QueueItem, QueueError>> + Send;

    /// 제거되지 않은 모든 항목을 삽입 순서대로 반환합니다.
    fn list(&self) -> impl Future<Output = Result<Vec<QueueItem>, QueueError>> + Send;

    /// 주어진 항목들을 삭제합니다. 이미 삭제된 항목은 무시합니다.
    fn remove(&self, items: &[QueueItem]) -> impl Future<Output = Result<(), QueueError>> + Send;
}
