//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logship_`
//! - 모듈명: `shipper_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logship_core::metrics::SHIPPER_LOGS_SENT_TOTAL).increment(1);
//! ```

use metrics::{describe_counter, describe_gauge};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Shipper 메트릭 ─────────────────────────────────────────────────

/// Shipper: 큐에 영속화된 로그 수 (counter)
pub const SHIPPER_LOGS_SENT_TOTAL: &str = "logship_shipper_logs_sent_total";

/// Shipper: 전달 완료된 배치 수 (counter)
pub const SHIPPER_BATCHES_DELIVERED_TOTAL: &str = "logship_shipper_batches_delivered_total";

/// Shipper: 전달 완료된 로그 수 (counter)
pub const SHIPPER_LOGS_DELIVERED_TOTAL: &str = "logship_shipper_logs_delivered_total";

/// Shipper: 출력 싱크 호출 수 (counter, label: result)
pub const SHIPPER_DELIVERY_ATTEMPTS_TOTAL: &str = "logship_shipper_delivery_attempts_total";

/// Shipper: 재시도 소진으로 포기된 배치 수 (counter)
pub const SHIPPER_BATCHES_EXHAUSTED_TOTAL: &str = "logship_shipper_batches_exhausted_total";

/// Shipper: 진행 중인 플러시 때문에 건너뛴 틱 수 (counter)
pub const SHIPPER_FLUSH_SKIPPED_TOTAL: &str = "logship_shipper_flush_skipped_total";

/// Shipper: 인메모리 버퍼 내 항목 수 (gauge)
pub const SHIPPER_BUFFER_SIZE: &str = "logship_shipper_buffer_size";

/// Shipper: 포기된 배치에 속한 항목 수 (gauge)
pub const SHIPPER_ABANDONED_SIZE: &str = "logship_shipper_abandoned_size";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없으면 no-op입니다.
pub fn describe_metrics() {
    describe_counter!(
        SHIPPER_LOGS_SENT_TOTAL,
        "Total number of logs persisted to the queue by send()"
    );
    describe_counter!(
        SHIPPER_BATCHES_DELIVERED_TOTAL,
        "Total number of batches acknowledged by the output sink"
    );
    describe_counter!(
        SHIPPER_LOGS_DELIVERED_TOTAL,
        "Total number of logs acknowledged by the output sink"
    );
    describe_counter!(
        SHIPPER_DELIVERY_ATTEMPTS_TOTAL,
        "Total number of output sink invocations, labelled by result"
    );
    describe_counter!(
        SHIPPER_BATCHES_EXHAUSTED_TOTAL,
        "Total number of batches abandoned after exhausting retries"
    );
    describe_counter!(
        SHIPPER_FLUSH_SKIPPED_TOTAL,
        "Total number of flush ticks skipped because a flush was in flight"
    );
    describe_gauge!(
        SHIPPER_BUFFER_SIZE,
        "Current number of items waiting in the in-memory buffer"
    );
    describe_gauge!(
        SHIPPER_ABANDONED_SIZE,
        "Current number of persisted items abandoned by exhausted retries"
    );
}
