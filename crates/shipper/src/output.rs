//! 출력 핸들러 -- 배치를 원격 수집기로 전달하는 싱크 계약
//!
//! 엔진은 [`OutputHandler`] 하나만 보관합니다. 실제 전송(HTTP, 파일, stdout 등)은
//! 호출자가 구현합니다.
//!
//! `Fn(Vec<LogRecord>) -> Future<Output = Result<(), OutputError>>` 형태의 비동기
//! 클로저는 자동으로 `OutputHandler`를 구현합니다.
//!
//! ```ignore
//! shipper.add_output(|logs: Vec<LogRecord>| async move {
//!     client.post(&logs).await.map_err(|e| OutputError::Delivery(e.to_string()))
//! });
//! ```

use std::future::Future;

use logship_core::error::OutputError;
use logship_core::pipeline::BoxFuture;
use logship_core::types::LogRecord;

/// 배치 전달 싱크
///
/// `deliver`가 `Ok`를 반환하면 배치 전체가 전달된 것으로 간주합니다.
/// 부분 성공은 표현하지 않으며, `Err`이면 배치 전체가 재시도됩니다.
pub trait OutputHandler: Send + Sync {
    /// 배치 하나를 전달합니다.
    ///
    /// 배치는 버퍼 순서(오래된 것부터)를 유지하며 최대
    /// [`LOG_LIMIT`](crate::config::LOG_LIMIT)개입니다.
    fn deliver<'a>(&'a self, logs: &'a [LogRecord]) -> BoxFuture<'a, Result<(), OutputError>>;
}

impl<F, Fut> OutputHandler for F
where
    F: Fn(Vec<LogRecord>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), OutputError>> + Send + 'static,
{
    fn deliver<'a>(&'a self, logs: &'a [LogRecord]) -> BoxFuture<'a, Result<(), OutputError>> {
        Box::pin(self(logs.to_vec()))
    }
}
