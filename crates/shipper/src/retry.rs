//! 재시도 실행기 -- 지수 백오프로 배치 전달을 반복합니다.
//!
//! 시도 `n`(0부터)이 실패하고 `n < max_retry`이면 `first_retry_interval * 2^n`만큼
//! 기다린 뒤 다시 시도합니다. 마지막 시도가 실패하면 추가 대기 없이 포기합니다.
//! 따라서 계속 실패하는 싱크는 정확히 `max_retry + 1`번 호출되고,
//! 그 사이 대기 시간은 `I, 2I, ..., 2^(max_retry-1) I`입니다.
//!
//! 싱크 호출과 백오프 대기는 모두 [`CancellationToken`]과 경합하므로,
//! 엔진 정지 시 다음 대기 지점에서 즉시 중단됩니다.

use std::time::Duration;

use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use logship_core::error::OutputError;
use logship_core::metrics as m;
use logship_core::types::LogRecord;

use crate::config::ShipperConfig;
use crate::output::OutputHandler;

/// 재시도 실패 결과
#[derive(Debug, Clone, thiserror::Error)]
pub enum RetryError {
    /// 모든 시도가 실패함
    #[error("delivery failed after {attempts} attempts: {last_error}")]
    Exhausted {
        /// 싱크 호출 횟수
        attempts: u32,
        /// 마지막 시도의 에러
        last_error: OutputError,
    },

    /// 취소 토큰에 의해 중단됨
    #[error("delivery aborted after {attempts} attempts")]
    Aborted {
        /// 중단 시점까지 시작된 싱크 호출 횟수
        attempts: u32,
    },
}

/// 재시도 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 최대 재시도 횟수 (총 시도 횟수는 `max_retry + 1`)
    pub max_retry: u32,
    /// 첫 재시도 전 대기 시간
    pub first_retry_interval: Duration,
}

impl RetryPolicy {
    /// 새 정책을 생성합니다.
    pub fn new(max_retry: u32, first_retry_interval: Duration) -> Self {
        Self {
            max_retry,
            first_retry_interval,
        }
    }

    /// 시도 `attempt`(0부터)가 실패한 뒤의 대기 시간
    ///
    /// 오버플로 시 `Duration::MAX`로 포화됩니다.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.first_retry_interval
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
    }

    /// 모든 시도가 실패할 때 누적되는 총 대기 시간
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_retry).fold(Duration::ZERO, |acc, n| acc.saturating_add(self.backoff(n)))
    }
}

impl From<&ShipperConfig> for RetryPolicy {
    fn from(config: &ShipperConfig) -> Self {
        Self::new(config.max_retry, config.first_retry_interval)
    }
}

/// 재시도 실행기
///
/// 한 번에 하나의 시도만 수행합니다. 시도 간 병렬성은 없습니다.
#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// 새 실행기를 생성합니다.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// 현재 정책을 반환합니다.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 배치를 전달합니다. 성공 시 싱크 호출 횟수를 반환합니다.
    ///
    /// # Errors
    ///
    /// - `RetryError::Exhausted`: `max_retry + 1`번 모두 실패
    /// - `RetryError::Aborted`: `cancel`이 취소됨
    pub async fn deliver(
        &self,
        handler: &dyn OutputHandler,
        logs: &[LogRecord],
        cancel: &CancellationToken,
    ) -> Result<u32, RetryError> {
        let mut attempts = 0u32;

        for attempt in 0..=self.policy.max_retry {
            if cancel.is_cancelled() {
                return Err(RetryError::Aborted { attempts });
            }
            attempts += 1;

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RetryError::Aborted { attempts }),
                result = handler.deliver(logs) => result,
            };

            let last_error = match result {
                Ok(()) => {
                    counter!(m::SHIPPER_DELIVERY_ATTEMPTS_TOTAL, m::LABEL_RESULT => "success")
                        .increment(1);
                    debug!(attempts, batch_size = logs.len(), "batch delivered");
                    return Ok(attempts);
                }
                Err(e) => {
                    counter!(m::SHIPPER_DELIVERY_ATTEMPTS_TOTAL, m::LABEL_RESULT => "failure")
                        .increment(1);
                    e
                }
            };

            if attempt == self.policy.max_retry {
                return Err(RetryError::Exhausted {
                    attempts,
                    last_error,
                });
            }

            let backoff = self.policy.backoff(attempt);
            warn!(
                attempt = attempts,
                max_attempts = self.policy.max_retry + 1,
                backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                error = %last_error,
                "delivery failed, retrying"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RetryError::Aborted { attempts }),
                () = tokio::time::sleep(backoff) => {}
            }
        }

        // 0..=max_retry 루프는 항상 위에서 반환됨
        Err(RetryError::Aborted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use logship_core::pipeline::BoxFuture;
    use tokio::time::Instant;

    /// 처음 `failures`번 실패하고 이후 성공하는 싱크
    struct FlakySink {
        failures: usize,
        calls: Mutex<Vec<Instant>>,
    }

    impl FlakySink {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }

        fn gaps(&self) -> Vec<Duration> {
            self.call_times()
                .windows(2)
                .map(|w| w[1].duration_since(w[0]))
                .collect()
        }
    }

    impl OutputHandler for FlakySink {
        fn deliver<'a>(&'a self, _logs: &'a [LogRecord]) -> BoxFuture<'a, Result<(), OutputError>> {
            Box::pin(async move {
                let mut calls = self.calls.lock().unwrap();
                calls.push(Instant::now());
                if calls.len() <= self.failures {
                    Err(OutputError::Delivery(format!("failure #{}", calls.len())))
                } else {
                    Ok(())
                }
            })
        }
    }

    fn executor(max_retry: u32, first_ms: u64) -> RetryExecutor {
        RetryExecutor::new(RetryPolicy::new(
            max_retry,
            Duration::from_millis(first_ms),
        ))
    }

    fn batch() -> Vec<LogRecord> {
        vec![LogRecord::new().with("msg", "x")]
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(4), Duration::from_millis(1600));
        assert_eq!(policy.total_backoff(), Duration::from_millis(3100));
    }

    #[test]
    fn backoff_saturates() {
        let policy = RetryPolicy::new(30, Duration::MAX);
        assert_eq!(policy.backoff(3), Duration::MAX);
        assert_eq!(policy.backoff(64), Duration::MAX);
        assert_eq!(policy.total_backoff(), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_first_attempt_without_waiting() {
        let sink = FlakySink::new(0);
        let started = Instant::now();
        let attempts = executor(5, 1000)
            .deliver(&sink, &batch(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(attempts, 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_exponential_delays_until_success() {
        let sink = FlakySink::new(3);
        let attempts = executor(5, 100)
            .deliver(&sink, &batch(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(attempts, 4);
        assert_eq!(
            sink.gaps(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_retry_plus_one_attempts_without_trailing_sleep() {
        let sink = FlakySink::new(usize::MAX);
        let started = Instant::now();
        let err = executor(3, 50)
            .deliver(&sink, &batch(), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            RetryError::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 4);
                assert!(last_error.to_string().contains("failure #4"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(sink.call_times().len(), 4);
        // 50 + 100 + 200, 마지막 실패 뒤에는 대기 없음
        assert_eq!(started.elapsed(), Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_max_retry_means_single_attempt() {
        let sink = FlakySink::new(usize::MAX);
        let err = executor(0, 1000)
            .deliver(&sink, &batch(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 1, .. }));
        assert_eq!(sink.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_aborts() {
        let sink = Arc::new(FlakySink::new(usize::MAX));
        let cancel = CancellationToken::new();

        let task = {
            let sink = Arc::clone(&sink);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                executor(5, 1000)
                    .deliver(sink.as_ref(), &batch(), &cancel)
                    .await
            })
        };

        // 첫 시도 실패 후 1초 백오프 중
        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, RetryError::Aborted { attempts: 1 }));
        assert_eq!(sink.call_times().len(), 1);
    }

    #[tokio::test]
    async fn already_cancelled_token_never_calls_the_sink() {
        let sink = FlakySink::new(0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = executor(5, 10)
            .deliver(&sink, &batch(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RetryError::Aborted { attempts: 0 }));
        assert!(sink.call_times().is_empty());
    }
}
