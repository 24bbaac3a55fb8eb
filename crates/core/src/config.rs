//! 설정 관리 -- logship.toml 파싱 및 런타임 설정
//!
//! [`LogshipConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGSHIP_SHIPPER_MAX_RETRY=3` 형식)
//! 3. 설정 파일 (`logship.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logship_core::error::LogshipError> {
//! use logship_core::config::LogshipConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogshipConfig::load("logship.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogshipConfig::parse("[shipper]\nmax_retry = 3")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogshipError};

/// 기본 플러시 간격 (2분)
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 2 * 60 * 1000;
/// 배치당 기본 최대 재시도 횟수
pub const DEFAULT_MAX_RETRY: u32 = 5;
/// 기본 첫 재시도 간격 (백오프 단위)
pub const DEFAULT_FIRST_RETRY_INTERVAL_MS: u64 = 1000;
/// 2^n 백오프가 u64 밀리초 범위를 넘지 않도록 제한하는 최대 재시도 횟수
pub const MAX_RETRY_LIMIT: u32 = 30;

/// logship 통합 설정
///
/// `logship.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 컴포넌트는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogshipConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 전송 엔진 설정
    #[serde(default)]
    pub shipper: ShipperSection,
    /// 영속 큐 설정
    #[serde(default)]
    pub queue: QueueConfig,
    /// 출력 싱크 설정
    #[serde(default)]
    pub output: OutputConfig,
    /// 필터 설정
    #[serde(default)]
    pub filters: FiltersConfig,
}

impl LogshipConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogshipError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogshipError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogshipError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogshipError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogshipError> {
        toml::from_str(toml_str).map_err(|e| {
            LogshipError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGSHIP_{SECTION}_{FIELD}`
    /// 예: `LOGSHIP_SHIPPER_FLUSH_INTERVAL_MS=5000`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGSHIP_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGSHIP_GENERAL_LOG_FORMAT");

        // Shipper
        override_u64(
            &mut self.shipper.flush_interval_ms,
            "LOGSHIP_SHIPPER_FLUSH_INTERVAL_MS",
        );
        override_u32(&mut self.shipper.max_retry, "LOGSHIP_SHIPPER_MAX_RETRY");
        override_u64(
            &mut self.shipper.first_retry_interval_ms,
            "LOGSHIP_SHIPPER_FIRST_RETRY_INTERVAL_MS",
        );
        override_string(&mut self.shipper.stop_policy, "LOGSHIP_SHIPPER_STOP_POLICY");
        override_u64(
            &mut self.shipper.abandoned_recheck_interval_ms,
            "LOGSHIP_SHIPPER_ABANDONED_RECHECK_INTERVAL_MS",
        );

        // Queue
        override_string(&mut self.queue.kind, "LOGSHIP_QUEUE_KIND");
        override_string(&mut self.queue.path, "LOGSHIP_QUEUE_PATH");

        // Output
        override_string(&mut self.output.kind, "LOGSHIP_OUTPUT_KIND");
        override_string(&mut self.output.path, "LOGSHIP_OUTPUT_PATH");

        // Filters
        override_csv(&mut self.filters.drop_fields, "LOGSHIP_FILTERS_DROP_FIELDS");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogshipError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.shipper.flush_interval_ms == 0 {
            return Err(invalid(
                "shipper.flush_interval_ms",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.shipper.max_retry > MAX_RETRY_LIMIT {
            return Err(invalid(
                "shipper.max_retry",
                format!("must be 0-{MAX_RETRY_LIMIT}"),
            ));
        }

        let valid_policies = ["abort", "drain"];
        if !valid_policies.contains(&self.shipper.stop_policy.as_str()) {
            return Err(invalid(
                "shipper.stop_policy",
                format!("must be one of: {}", valid_policies.join(", ")),
            ));
        }

        let valid_queues = ["memory", "file"];
        if !valid_queues.contains(&self.queue.kind.as_str()) {
            return Err(invalid(
                "queue.kind",
                format!("must be one of: {}", valid_queues.join(", ")),
            ));
        }
        if self.queue.kind == "file" && self.queue.path.is_empty() {
            return Err(invalid(
                "queue.path",
                "path must not be empty when queue kind is 'file'".to_owned(),
            ));
        }

        let valid_outputs = ["stdout", "file"];
        if !valid_outputs.contains(&self.output.kind.as_str()) {
            return Err(invalid(
                "output.kind",
                format!("must be one of: {}", valid_outputs.join(", ")),
            ));
        }
        if self.output.kind == "file" && self.output.path.is_empty() {
            return Err(invalid(
                "output.path",
                "path must not be empty when output kind is 'file'".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> LogshipError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 전송 엔진 설정 섹션
///
/// 밀리초 단위 정수로 기록하며, 엔진 쪽에서 `Duration`으로 변환합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipperSection {
    /// 플러시 주기 (밀리초)
    pub flush_interval_ms: u64,
    /// 배치당 최대 재시도 횟수 (0이면 한 번만 시도)
    pub max_retry: u32,
    /// 첫 재시도 대기 시간 (밀리초), 이후 두 배씩 증가
    pub first_retry_interval_ms: u64,
    /// 정지 시 진행 중인 플러시 처리 방식 (abort, drain)
    pub stop_policy: String,
    /// 포기된 배치 재검사 주기 (밀리초, 0이면 비활성)
    pub abandoned_recheck_interval_ms: u64,
}

impl Default for ShipperSection {
    fn default() -> Self {
        Self {
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            max_retry: DEFAULT_MAX_RETRY,
            first_retry_interval_ms: DEFAULT_FIRST_RETRY_INTERVAL_MS,
            stop_policy: "abort".to_owned(),
            abandoned_recheck_interval_ms: 0,
        }
    }
}

/// 영속 큐 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// 큐 종류 (memory, file)
    pub kind: String,
    /// 파일 큐 경로
    pub path: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            kind: "file".to_owned(),
            path: "/var/lib/logship/queue.jsonl".to_owned(),
        }
    }
}

/// 출력 싱크 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// 싱크 종류 (stdout, file)
    pub kind: String,
    /// 파일 싱크 경로
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            kind: "stdout".to_owned(),
            path: String::new(),
        }
    }
}

/// 필터 설정
///
/// 선언 순서와 무관하게 `add_fields` 다음 `drop_fields` 순으로 적용됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// 모든 로그에서 제거할 필드
    pub drop_fields: Vec<String>,
    /// 모든 로그에 추가할 고정 필드
    pub add_fields: BTreeMap<String, String>,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_reference_values() {
        let config = LogshipConfig::default();
        assert_eq!(config.shipper.flush_interval_ms, 120_000);
        assert_eq!(config.shipper.max_retry, 5);
        assert_eq!(config.shipper.first_retry_interval_ms, 1000);
        assert_eq!(config.shipper.stop_policy, "abort");
        assert_eq!(config.shipper.abandoned_recheck_interval_ms, 0);
        assert_eq!(config.queue.kind, "file");
        assert_eq!(config.output.kind, "stdout");
    }

    #[test]
    fn default_config_passes_validation() {
        LogshipConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = LogshipConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.shipper.max_retry, 5);
    }

    #[test]
    fn partial_toml_merges_with_defaults() {
        let toml = r#"
[shipper]
max_retry = 0

[filters]
drop_fields = ["password"]

[filters.add_fields]
app = "checkout"
"#;
        let config = LogshipConfig::parse(toml).unwrap();
        assert_eq!(config.shipper.max_retry, 0);
        // 명시하지 않은 필드는 기본값 유지
        assert_eq!(config.shipper.flush_interval_ms, 120_000);
        assert_eq!(config.filters.drop_fields, vec!["password"]);
        assert_eq!(
            config.filters.add_fields.get("app").map(String::as_str),
            Some("checkout")
        );
    }

    #[test]
    fn invalid_toml_returns_parse_error() {
        let err = LogshipConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            LogshipError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_flush_interval() {
        let mut config = LogshipConfig::default();
        config.shipper.flush_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("flush_interval_ms"));
    }

    #[test]
    fn validate_rejects_excessive_max_retry() {
        let mut config = LogshipConfig::default();
        config.shipper.max_retry = MAX_RETRY_LIMIT + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_retry"));
    }

    #[test]
    fn validate_accepts_zero_max_retry() {
        let mut config = LogshipConfig::default();
        config.shipper.max_retry = 0;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_unknown_stop_policy() {
        let mut config = LogshipConfig::default();
        config.shipper.stop_policy = "wait".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stop_policy"));
    }

    #[test]
    fn validate_rejects_file_queue_without_path() {
        let mut config = LogshipConfig::default();
        config.queue.path = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("queue.path"));
    }

    #[test]
    fn validate_rejects_file_output_without_path() {
        let mut config = LogshipConfig::default();
        config.output.kind = "file".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.path"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = LogshipConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    #[serial_test::serial]
    fn env_override_u32() {
        let mut val = 5;
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_LOGSHIP_U32", "2") };
        override_u32(&mut val, "TEST_LOGSHIP_U32");
        assert_eq!(val, 2);
        unsafe { std::env::remove_var("TEST_LOGSHIP_U32") };
    }

    #[test]
    #[serial_test::serial]
    fn env_override_invalid_number_keeps_original() {
        let mut val = 1000u64;
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_LOGSHIP_U64_BAD", "soon") };
        override_u64(&mut val, "TEST_LOGSHIP_U64_BAD");
        assert_eq!(val, 1000);
        unsafe { std::env::remove_var("TEST_LOGSHIP_U64_BAD") };
    }

    #[test]
    #[serial_test::serial]
    fn env_override_csv_skips_empty_entries() {
        let mut val = vec![];
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_LOGSHIP_CSV", "token, ,password") };
        override_csv(&mut val, "TEST_LOGSHIP_CSV");
        assert_eq!(val, vec!["token", "password"]);
        unsafe { std::env::remove_var("TEST_LOGSHIP_CSV") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_LOGSHIP_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let mut config = LogshipConfig::default();
        config
            .filters
            .add_fields
            .insert("env".to_owned(), "prod".to_owned());
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = LogshipConfig::parse(&toml_str).unwrap();
        assert_eq!(parsed.shipper.max_retry, config.shipper.max_retry);
        assert_eq!(parsed.filters.add_fields, config.filters.add_fields);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = LogshipConfig::from_file("/nonexistent/path/logship.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LogshipError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logship.toml");
        tokio::fs::write(&path, "[shipper]\nflush_interval_ms = 5000\n")
            .await
            .unwrap();
        let config = LogshipConfig::from_file(&path).await.unwrap();
        assert_eq!(config.shipper.flush_interval_ms, 5000);
    }
}
