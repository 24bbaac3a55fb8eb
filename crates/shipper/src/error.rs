//! 전송 엔진 에러 타입
//!
//! [`ShipperError`]는 전송 엔진의 공개 연산(`send`, `start`, `stop`,
//! `flush_now`)이 호출자에게 돌려주는 모든 에러를 표현합니다.
//! `From<ShipperError> for LogshipError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 출력 싱크의 일시적 실패는 재시도 실행기 안에서 처리되며
//! 여기에 나타나지 않습니다.

use logship_core::error::{FilterError, LogshipError, QueueError};

/// 전송 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ShipperError {
    /// 필터가 로그를 거부함 (재시도하지 않음)
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// 영속 큐 연산 실패
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// 출력 핸들러가 등록되지 않음
    #[error("no output handler registered")]
    NoOutput,

    /// 이미 실행 중
    #[error("shipper is already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("shipper is not running")]
    NotRunning,

    /// 정지가 아직 끝나지 않음
    #[error("shipper is still stopping")]
    Stopping,

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<ShipperError> for LogshipError {
    fn from(err: ShipperError) -> Self {
        match err {
            ShipperError::Filter(e) => LogshipError::Filter(e),
            ShipperError::Queue(e) => LogshipError::Queue(e),
            other => LogshipError::Shipper(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_error_is_transparent() {
        let err: ShipperError = FilterError::new("redact", "bad input").into();
        assert_eq!(
            err.to_string(),
            FilterError::new("redact", "bad input").to_string()
        );
    }

    #[test]
    fn queue_error_keeps_its_kind_at_top_level() {
        let err = ShipperError::Queue(QueueError::Unavailable("locked".to_owned()));
        let top: LogshipError = err.into();
        assert!(matches!(top, LogshipError::Queue(QueueError::Unavailable(_))));
    }

    #[test]
    fn lifecycle_errors_become_shipper_errors() {
        let top: LogshipError = ShipperError::AlreadyRunning.into();
        assert!(matches!(top, LogshipError::Shipper(ref msg) if msg.contains("already running")));
    }

    #[test]
    fn config_error_display() {
        let err = ShipperError::Config {
            field: "flush_interval".to_owned(),
            reason: "must be at least 1ms".to_owned(),
        };
        assert!(err.to_string().contains("flush_interval"));
    }
}
