//! 필터 파이프라인 -- 영속화 전에 각 로그에 적용되는 순수 변환
//!
//! 필터는 등록 순서대로 왼쪽에서 오른쪽으로 합성됩니다.
//! 한 필터의 출력이 다음 필터의 입력이 되며, 한 번 등록된 필터는 제거할 수 없습니다.
//!
//! 필터는 I/O를 하지 않고 입력에 대해 결정적이어야 합니다 (컴파일 타임에 강제되지는 않음).
//! 필터가 에러를 반환하면 현재 `send` 호출이 그 에러로 중단되며, 아무것도 영속화되지 않습니다.

use logship_core::error::FilterError;
use logship_core::types::LogRecord;

/// 로그 변환 필터
///
/// `Fn(LogRecord) -> Result<LogRecord, FilterError>` 클로저는 자동으로 `Filter`를 구현합니다.
/// 실패하지 않는 변환은 [`map_filter`]로 감쌉니다.
pub trait Filter: Send + Sync {
    /// 로그 하나를 변환합니다.
    fn apply(&self, log: LogRecord) -> Result<LogRecord, FilterError>;
}

impl<F> Filter for F
where
    F: Fn(LogRecord) -> Result<LogRecord, FilterError> + Send + Sync,
{
    fn apply(&self, log: LogRecord) -> Result<LogRecord, FilterError> {
        self(log)
    }
}

/// 실패하지 않는 변환 함수를 필터로 감싼 타입
pub struct MapFilter<F> {
    f: F,
}

impl<F> Filter for MapFilter<F>
where
    F: Fn(LogRecord) -> LogRecord + Send + Sync,
{
    fn apply(&self, log: LogRecord) -> Result<LogRecord, FilterError> {
        Ok((self.f)(log))
    }
}

/// 실패하지 않는 변환 함수로 필터를 만듭니다.
pub fn map_filter<F>(f: F) -> MapFilter<F>
where
    F: Fn(LogRecord) -> LogRecord + Send + Sync,
{
    MapFilter { f }
}

/// 등록 순서를 보존하는 필터 목록
#[derive(Default)]
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    /// 빈 파이프라인을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 필터를 파이프라인 끝에 추가합니다.
    pub fn add(&mut self, filter: impl Filter + 'static) {
        self.filters.push(Box::new(filter));
    }

    /// 등록된 모든 필터를 순서대로 적용합니다.
    ///
    /// 첫 번째 실패에서 멈추고 그 에러를 반환합니다.
    pub fn apply(&self, log: LogRecord) -> Result<LogRecord, FilterError> {
        self.filters
            .iter()
            .try_fold(log, |value, filter| filter.apply(value))
    }

    /// 등록된 필터 수
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// 필터가 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// 고정 필드를 추가하는 필터
///
/// 기본적으로 이미 존재하는 키는 덮어쓰지 않습니다.
#[derive(Debug, Clone)]
pub struct AddFields {
    fields: Vec<(String, serde_json::Value)>,
    overwrite: bool,
}

impl AddFields {
    /// 추가할 필드 목록으로 필터를 생성합니다.
    pub fn new<K, V, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            overwrite: false,
        }
    }

    /// 기존 키도 덮어쓰도록 설정합니다.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

impl Filter for AddFields {
    fn apply(&self, mut log: LogRecord) -> Result<LogRecord, FilterError> {
        for (key, value) in &self.fields {
            if self.overwrite || !log.contains_key(key) {
                log.insert(key.clone(), value.clone());
            }
        }
        Ok(log)
    }
}

/// 지정한 필드를 제거하는 필터
#[derive(Debug, Clone)]
pub struct DropFields {
    keys: Vec<String>,
}

impl DropFields {
    /// 제거할 키 목록으로 필터를 생성합니다.
    pub fn new<K, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl Filter for DropFields {
    fn apply(&self, mut log: LogRecord) -> Result<LogRecord, FilterError> {
        for key in &self.keys {
            log.remove(key);
        }
        Ok(log)
    }
}
