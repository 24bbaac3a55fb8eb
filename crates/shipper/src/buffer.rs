//! 로그 버퍼링 -- 아직 전달이 확인되지 않은 항목의 인메모리 FIFO
//!
//! [`LogBuffer`]는 큐에 영속화된 항목을 꼬리에 쌓고,
//! 플러시 시 머리에서 최대 [`LOG_LIMIT`](crate::config::LOG_LIMIT)개씩 꺼냅니다.
//!
//! # 불변식
//! 버퍼의 모든 항목은 큐에 영속화되어 있고 아직 제거되지 않은 항목입니다.
//! 큐와 버퍼가 완전히 일치하는 것은 엔진 시작 시 [`LogBuffer::restore`] 직후뿐입니다.
//! 재시도 소진으로 포기된 배치는 버퍼에서는 빠지지만 큐에는 남습니다.

use std::collections::VecDeque;

use logship_core::types::LogRecord;

use crate::queue::QueueItem;

/// 인메모리 로그 버퍼
#[derive(Debug, Default)]
pub struct LogBuffer {
    /// 버퍼 내부 저장소 (머리가 가장 오래된 항목)
    items: VecDeque<QueueItem>,
    /// 총 유입 항목 수 (통계용)
    total_received: u64,
}

impl LogBuffer {
    /// 빈 버퍼를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 큐의 전체 목록으로 버퍼를 다시 채웁니다.
    ///
    /// 기존 내용은 버려집니다. 시작 시 복구 경로에서만 사용합니다.
    pub fn restore(&mut self, items: Vec<QueueItem>) {
        self.total_received += items.len() as u64;
        self.items = items.into();
    }

    /// 항목을 꼬리에 추가합니다.
    pub fn push(&mut self, item: QueueItem) {
        self.total_received += 1;
        self.items.push_back(item);
    }

    /// 머리에서 최대 `limit`개를 꺼냅니다 (오래된 순서).
    ///
    /// 버퍼가 비어있으면 빈 Vec을 반환합니다.
    pub fn drain_batch(&mut self, limit: usize) -> Vec<QueueItem> {
        let count = limit.min(self.items.len());
        self.items.drain(..count).collect()
    }

    /// 꺼냈던 항목들을 순서를 유지한 채 머리로 되돌립니다.
    ///
    /// 중단된 배치나 복구된 배치는 버퍼의 어떤 항목보다 오래되었으므로 앞에 둡니다.
    pub fn requeue_front(&mut self, items: Vec<QueueItem>) {
        for item in items.into_iter().rev() {
            self.items.push_front(item);
        }
    }

    /// 현재 버퍼에 저장된 항목 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 버퍼가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 총 유입 항목 수를 반환합니다.
    pub fn total_received(&self) -> u64 {
        self.total_received
    }

    /// 버퍼 내용의 로그 복사본 (머리부터)
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.items.iter().map(|item| item.log.clone()).collect()
    }
}
