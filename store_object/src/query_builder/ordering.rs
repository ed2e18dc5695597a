//! Ordering directives
//!
//! A directive is a field path plus a direction. Nested paths render as a chain of
//! single-key mappings ending in the direction, e.g. `{ category: { name: "desc" } }`.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Sort direction; unknown strings are carried through untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
    Other(String),
}

impl SortOrder {
    pub fn parse(direction: &str) -> Self {
        match direction {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            other => SortOrder::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
            SortOrder::Other(other) => other,
        }
    }

    /// `None` for directions a SQL backend cannot express
    pub fn to_sql(&self) -> Option<&'static str> {
        match self {
            SortOrder::Asc => Some("ASC"),
            SortOrder::Desc => Some("DESC"),
            SortOrder::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub path: Vec<String>,
    pub direction: SortOrder,
}

impl OrderBy {
    pub fn new(field: &str, direction: SortOrder) -> Self {
        Self {
            path: vec![field.to_string()],
            direction,
        }
    }

    pub fn asc(field: &str) -> Self {
        Self::new(field, SortOrder::Asc)
    }

    pub fn desc(field: &str) -> Self {
        Self::new(field, SortOrder::Desc)
    }

    pub fn nested<S: Into<String>>(path: Vec<S>, direction: SortOrder) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            direction,
        }
    }

    pub fn is_nested(&self) -> bool {
        self.path.len() > 1
    }

    pub fn to_value(&self) -> Value {
        self.path
            .iter()
            .rev()
            .fold(Value::String(self.direction.as_str().to_string()), |inner, key| {
                let mut map = Map::new();
                map.insert(key.clone(), inner);
                Value::Object(map)
            })
    }
}

impl Serialize for OrderBy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
