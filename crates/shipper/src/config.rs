//! 전송 엔진 설정
//!
//! [`ShipperConfig`]는 core의 [`ShipperSection`](logship_core::config::ShipperSection)을
//! 기반으로 엔진이 사용하는 `Duration` 단위 설정을 제공합니다.
//! 생성 이후에는 변경되지 않습니다.
//!
//! # 사용 예시
//! ```ignore
//! use logship_core::config::LogshipConfig;
//! use logship_shipper::config::ShipperConfig;
//!
//! let core_config = LogshipConfig::default();
//! let config = ShipperConfig::from_core(&core_config.shipper)?;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use logship_core::config::{
    DEFAULT_FIRST_RETRY_INTERVAL_MS, DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_MAX_RETRY,
    MAX_RETRY_LIMIT, ShipperSection,
};

use crate::error::ShipperError;

/// 플러시 한 번에 가져가는 최대 항목 수
pub const LOG_LIMIT: usize = 10;

/// 정지 시 진행 중인 플러시 처리 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// 진행 중인 재시도 시퀀스를 다음 대기 지점에서 중단 (기본값)
    ///
    /// 중단된 배치는 버퍼 앞쪽으로 되돌아가며 큐에도 남아 있습니다.
    #[default]
    Abort,
    /// 진행 중인 플러시가 성공 또는 소진될 때까지 기다림
    Drain,
}

impl StopPolicy {
    /// 설정 문자열을 파싱합니다.
    pub fn parse(value: &str) -> Result<Self, ShipperError> {
        match value {
            "abort" => Ok(Self::Abort),
            "drain" => Ok(Self::Drain),
            other => Err(ShipperError::Config {
                field: "stop_policy".to_owned(),
                reason: format!("unknown policy '{other}', expected 'abort' or 'drain'"),
            }),
        }
    }
}

/// 전송 엔진 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipperConfig {
    /// 플러시 주기
    pub flush_interval: Duration,
    /// 배치당 최대 재시도 횟수 (총 시도 횟수는 `max_retry + 1`)
    pub max_retry: u32,
    /// 첫 재시도 대기 시간, 이후 시도마다 두 배
    pub first_retry_interval: Duration,
    /// 정지 정책
    pub stop_policy: StopPolicy,
    /// 포기된 배치 재검사 주기 (`None`이면 재시작 시에만 복구)
    pub abandoned_recheck_interval: Option<Duration>,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
            max_retry: DEFAULT_MAX_RETRY,
            first_retry_interval: Duration::from_millis(DEFAULT_FIRST_RETRY_INTERVAL_MS),
            stop_policy: StopPolicy::Abort,
            abandoned_recheck_interval: None,
        }
    }
}

impl ShipperConfig {
    /// core의 `ShipperSection`에서 엔진 설정을 생성합니다.
    pub fn from_core(core: &ShipperSection) -> Result<Self, ShipperError> {
        let config = Self {
            flush_interval: Duration::from_millis(core.flush_interval_ms),
            max_retry: core.max_retry,
            first_retry_interval: Duration::from_millis(core.first_retry_interval_ms),
            stop_policy: StopPolicy::parse(&core.stop_policy)?,
            abandoned_recheck_interval: match core.abandoned_recheck_interval_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ShipperError> {
        if self.flush_interval < Duration::from_millis(1) {
            return Err(ShipperError::Config {
                field: "flush_interval".to_owned(),
                reason: "must be at least 1ms".to_owned(),
            });
        }

        if self.max_retry > MAX_RETRY_LIMIT {
            return Err(ShipperError::Config {
                field: "max_retry".to_owned(),
                reason: format!("must be 0-{MAX_RETRY_LIMIT}"),
            });
        }

        if let Some(recheck) = self.abandoned_recheck_interval {
            if recheck < Duration::from_millis(1) {
                return Err(ShipperError::Config {
                    field: "abandoned_recheck_interval".to_owned(),
                    reason: "must be at least 1ms when set".to_owned(),
                });
            }
        }

        Ok(())
    }
}

/// 전송 엔진 설정 빌더
#[derive(Default)]
pub struct ShipperConfigBuilder {
    config: ShipperConfig,
}

impl ShipperConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 플러시 주기를 설정합니다.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    /// 최대 재시도 횟수를 설정합니다.
    pub fn max_retry(mut self, max_retry: u32) -> Self {
        self.config.max_retry = max_retry;
        self
    }

    /// 첫 재시도 간격을 설정합니다.
    pub fn first_retry_interval(mut self, interval: Duration) -> Self {
        self.config.first_retry_interval = interval;
        self
    }

    /// 정지 정책을 설정합니다.
    pub fn stop_policy(mut self, policy: StopPolicy) -> Self {
        self.config.stop_policy = policy;
        self
    }

    /// 포기된 배치 재검사 주기를 설정합니다.
    pub fn abandoned_recheck_interval(mut self, interval: Duration) -> Self {
        self.config.abandoned_recheck_interval = Some(interval);
        self
    }

    /// 설정을 검증하고 `ShipperConfig`를 생성합니다.
    pub fn build(self) -> Result<ShipperConfig, ShipperError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
