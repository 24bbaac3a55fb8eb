//! # logship-shipper
//!
//! 클라이언트 측 로그 전송 엔진입니다. 애플리케이션이 보낸 구조화된 로그를
//! 필터로 변환하고, 영속 큐에 기록한 뒤, 주기적으로 배치를 원격 싱크로 전달합니다.
//! 큐에서 항목을 제거하는 것은 싱크가 전달을 확인한 뒤뿐이므로
//! 프로세스가 재시작되어도 로그가 유실되지 않습니다 (at-least-once).
//!
//! # 모듈 구성
//!
//! - [`filter`]: 영속화 전에 적용되는 순수 변환 파이프라인
//! - [`queue`]: 영속 큐 어댑터 계약과 메모리/파일 구현
//! - [`buffer`]: 전달 대기 중인 항목의 인메모리 FIFO
//! - [`output`]: 배치 전달 싱크 계약
//! - [`retry`]: 지수 백오프 재시도 실행기
//! - [`shipper`]: 전체 흐름을 묶는 엔진과 빌더
//! - [`config`]: 엔진 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! send -> FilterPipeline -> QueueAdapter::push -> LogBuffer
//!                                                    |
//!              scheduler tick (flush_interval) ------+
//!                                                    v
//!        QueueAdapter::remove <- ok <- RetryExecutor -> OutputHandler
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod filter;
pub mod output;
pub mod queue;
pub mod retry;
pub mod shipper;

// --- 주요 타입 re-export ---

// 엔진
pub use shipper::{FlushOutcome, Shipper, ShipperBuilder, ShipperReport, ShipperStats};

// 설정
pub use config::{LOG_LIMIT, ShipperConfig, ShipperConfigBuilder, StopPolicy};

// 에러
pub use error::ShipperError;

// 필터
pub use filter::{AddFields, DropFields, Filter, FilterPipeline, map_filter};

// 큐
pub use queue::{FileQueue, ItemId, MemoryQueue, QueueAdapter, QueueItem};

// 출력
pub use output::OutputHandler;

// 재시도
pub use retry::{RetryError, RetryExecutor, RetryPolicy};

// 버퍼
pub use buffer::LogBuffer;
