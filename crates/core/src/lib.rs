//! logship 공통 크레이트
//!
//! 전송 엔진과 데몬이 공유하는 로그 레코드 타입, 에러 계층, 설정,
//! 메트릭 이름을 정의합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, FilterError, LogshipError, OutputError, QueueError};

// 설정
pub use config::LogshipConfig;

// 파이프라인 공통 타입
pub use pipeline::{BoxFuture, HealthStatus};

// 도메인 타입
pub use types::LogRecord;
