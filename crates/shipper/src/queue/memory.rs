//! 인메모리 큐 -- 프로세스 수명 동안만 유지되는 참조 구현
//!
//! 재시작 후 복구가 필요 없는 임베딩 환경이나 테스트에서 사용합니다.

use std::collections::HashSet;

use tokio::sync::Mutex;

use logship_core::error::QueueError;
use logship_core::types::LogRecord;

use super::{ItemId, QueueAdapter, QueueItem};

/// 비영속 인메모리 큐
#[derive(Default)]
pub struct MemoryQueue {
    items: Mutex<Vec<QueueItem>>,
}

impl MemoryQueue {
    /// 빈 큐를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기존 항목으로 채운 큐를 생성합니다 (재시작 시나리오 재현용).
    pub fn with_items(items: Vec<QueueItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    /// 현재 보관 중인 항목 수
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// 비어 있는지 확인합니다.
    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

impl QueueAdapter for MemoryQueue {
    async fn push(&self, log: LogRecord) -> Result<QueueItem, QueueError> {
        let item = QueueItem::new(log);
        self.items.lock().await.push(item.clone());
        Ok(item)
    }

    async fn list(&self) -> Result<Vec<QueueItem>, QueueError> {
        Ok(self.items.lock().await.clone())
    }

    async fn remove(&self, items: &[QueueItem]) -> Result<(), QueueError> {
        let ids: HashSet<ItemId> = items.iter().map(|item| item.id).collect();
        self.items.lock().await.retain(|item| !ids.contains(&item.id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(n: i64) -> LogRecord {
        LogRecord::new().with("n", n)
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let queue = MemoryQueue::new();
        for n in 0..5 {
            queue.push(log(n)).await.unwrap();
        }
        let listed = queue.list().await.unwrap();
        let ns: Vec<i64> = listed
            .iter()
            .filter_map(|item| item.log.get("n").and_then(|v| v.as_i64()))
            .collect();
        assert_eq!(ns, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn remove_deletes_exactly_the_given_items() {
        let queue = MemoryQueue::new();
        let a = queue.push(log(1)).await.unwrap();
        let b = queue.push(log(2)).await.unwrap();
        let c = queue.push(log(3)).await.unwrap();

        queue.remove(&[a.clone(), c.clone()]).await.unwrap();
        assert_eq!(queue.list().await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let queue = MemoryQueue::new();
        let a = queue.push(log(1)).await.unwrap();
        queue.remove(std::slice::from_ref(&a)).await.unwrap();
        queue.remove(std::slice::from_ref(&a)).await.unwrap();
        assert!(queue.is_empty().await);
    }
}
