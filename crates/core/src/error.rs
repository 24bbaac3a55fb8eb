//! 에러 타입 -- 도메인별 에러 정의

/// logship 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogshipError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 영속 큐 에러
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// 출력 싱크 에러
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// 필터 에러
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// 전송 엔진 에러
    #[error("shipper error: {0}")]
    Shipper(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 영속 큐 에러
///
/// 큐 어댑터의 push/list/remove 실패를 표현합니다.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// 저장소 I/O 실패
    #[error("queue io error: {0}")]
    Io(#[from] std::io::Error),

    /// 저장된 항목 직렬화/역직렬화 실패
    #[error("queue item codec error at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    /// 저장소를 사용할 수 없음
    #[error("queue unavailable: {0}")]
    Unavailable(String),
}

/// 출력 싱크 에러
///
/// 배치 전달 실패. 재시도 실행기가 이 에러를 받아 백오프합니다.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OutputError {
    /// 일시적 전달 실패
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// 싱크가 닫힘
    #[error("sink closed: {0}")]
    Closed(String),
}

/// 필터 에러
///
/// `send` 호출자에게 그대로 전파되며 재시도되지 않습니다.
#[derive(Debug, Clone, thiserror::Error)]
#[error("filter '{filter}' rejected log: {reason}")]
pub struct FilterError {
    /// 실패한 필터 이름
    pub filter: String,
    /// 실패 사유
    pub reason: String,
}

impl FilterError {
    /// 새 필터 에러를 생성합니다.
    pub fn new(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            reason: reason.into(),
        }
    }
}
