//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! [`LogRecord`]는 애플리케이션이 전달하는 구조화된 로그 한 건입니다.
//! 스키마는 호출자가 정하며, logship은 필터가 명시적으로 만든 변경 외에는
//! 레코드 내용을 건드리지 않습니다.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 구조화된 로그 레코드
///
/// JSON 객체(`Map<String, Value>`)를 감싼 newtype입니다.
/// 직렬화 시에는 내부 객체가 그대로 노출됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogRecord(Map<String, Value>);

impl LogRecord {
    /// 빈 레코드를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON 값에서 레코드를 생성합니다.
    ///
    /// 객체가 아닌 값(배열, 문자열 등)이면 원래 값을 그대로 돌려줍니다.
    pub fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }

    /// 필드를 추가하거나 교체합니다. 이전 값이 있으면 반환합니다.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// 체이닝용 필드 추가
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// 필드 값을 조회합니다.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// 필드 존재 여부
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// 필드를 제거합니다.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// 필드 수
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 필드가 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 내부 JSON 객체를 꺼냅니다.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// 내부 JSON 객체에 대한 참조
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for LogRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<LogRecord> for Value {
    fn from(record: LogRecord) -> Self {
        Value::Object(record.0)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("{}"),
        }
    }
}
