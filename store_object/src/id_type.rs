//! Record identifiers
//!
//! Records are addressed either by an integer key or by a UUID.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Uuid(Uuid),
}

impl RecordId {
    /// JSON form used in predicates and payloads
    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(n) => Value::from(*n),
            RecordId::Uuid(uuid) => Value::String(uuid.to_string()),
        }
    }

    /// Whether a stored JSON value identifies the same record
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (RecordId::Int(n), Value::Number(v)) => v.as_i64() == Some(*n),
            (RecordId::Int(n), Value::String(s)) => s.parse::<i64>().ok() == Some(*n),
            (RecordId::Uuid(uuid), Value::String(s)) => {
                Uuid::parse_str(s).map(|parsed| parsed == *uuid).unwrap_or(false)
            }
            _ => false,
        }
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Uuid(uuid) => write!(f, "{}", uuid),
        }
    }
}

impl From<i32> for RecordId {
    fn from(id: i32) -> Self {
        RecordId::Int(id as i64)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<u32> for RecordId {
    fn from(id: u32) -> Self {
        RecordId::Int(id as i64)
    }
}

impl From<Uuid> for RecordId {
    fn from(id: Uuid) -> Self {
        RecordId::Uuid(id)
    }
}

impl From<&Uuid> for RecordId {
    fn from(id: &Uuid) -> Self {
        RecordId::Uuid(*id)
    }
}

impl std::str::FromStr for RecordId {
    type Err = String;

    /// Route parameters arrive as strings; integers win over UUIDs
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<i64>() {
            return Ok(RecordId::Int(n));
        }
        Uuid::parse_str(s)
            .map(RecordId::Uuid)
            .map_err(|_| format!("'{}' is neither an integer nor a UUID", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_prefers_integer() {
        assert_eq!("42".parse::<RecordId>().unwrap(), RecordId::Int(42));
        let uuid = Uuid::new_v4();
        assert_eq!(
            uuid.to_string().parse::<RecordId>().unwrap(),
            RecordId::Uuid(uuid)
        );
        assert!("not-an-id".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_matches_stored_values() {
        let uuid = Uuid::new_v4();
        assert!(RecordId::Int(7).matches(&json!(7)));
        assert!(!RecordId::Int(7).matches(&json!(8)));
        assert!(RecordId::Uuid(uuid).matches(&json!(uuid.to_string())));
        assert!(!RecordId::Uuid(uuid).matches(&json!(7)));
    }
}
