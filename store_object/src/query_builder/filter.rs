//! Predicate trees
//!
//! A [`Filter`] maps field names to either a leaf [`Condition`] or a nested relation
//! filter; co-present fields are combined with AND. An optional `OR` branch carries
//! alternative filters. The rendered shape is the nested-mapping wire form:
//!
//! ```text
//! { "category": { "name": { "contains": "phone", "mode": "insensitive" } },
//!   "OR": [ ... ] }
//! ```

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key of the alternative branch in the rendered form
pub const OR_KEY: &str = "OR";

/// Leaf condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Equals,
    Not,
    In,
    NotIn,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    StartsWith,
    EndsWith,
}

impl QueryOperator {
    pub fn key(&self) -> &'static str {
        match self {
            QueryOperator::Equals => "equals",
            QueryOperator::Not => "not",
            QueryOperator::In => "in",
            QueryOperator::NotIn => "notIn",
            QueryOperator::Lt => "lt",
            QueryOperator::Lte => "lte",
            QueryOperator::Gt => "gt",
            QueryOperator::Gte => "gte",
            QueryOperator::Contains => "contains",
            QueryOperator::StartsWith => "startsWith",
            QueryOperator::EndsWith => "endsWith",
        }
    }

    /// Text operators honor [`QueryMode`]
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            QueryOperator::Contains | QueryOperator::StartsWith | QueryOperator::EndsWith
        )
    }
}

/// String matching mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryMode {
    #[default]
    Default,
    Insensitive,
}

/// Single `{operator: value}` leaf
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub operator: QueryOperator,
    pub value: Value,
    pub mode: QueryMode,
}

impl Condition {
    pub fn new(operator: QueryOperator, value: Value) -> Self {
        Self {
            operator,
            value,
            mode: QueryMode::Default,
        }
    }

    pub fn equals(value: Value) -> Self {
        Self::new(QueryOperator::Equals, value)
    }

    pub fn not(value: Value) -> Self {
        Self::new(QueryOperator::Not, value)
    }

    pub fn is_null() -> Self {
        Self::equals(Value::Null)
    }

    pub fn is_not_null() -> Self {
        Self::not(Value::Null)
    }

    pub fn in_values(values: Vec<Value>) -> Self {
        Self::new(QueryOperator::In, Value::Array(values))
    }

    pub fn not_in_values(values: Vec<Value>) -> Self {
        Self::new(QueryOperator::NotIn, Value::Array(values))
    }

    pub fn lt(value: Value) -> Self {
        Self::new(QueryOperator::Lt, value)
    }

    pub fn lte(value: Value) -> Self {
        Self::new(QueryOperator::Lte, value)
    }

    pub fn gt(value: Value) -> Self {
        Self::new(QueryOperator::Gt, value)
    }

    pub fn gte(value: Value) -> Self {
        Self::new(QueryOperator::Gte, value)
    }

    pub fn contains(text: &str) -> Self {
        Self::new(QueryOperator::Contains, Value::String(text.to_string()))
    }

    pub fn starts_with(text: &str) -> Self {
        Self::new(QueryOperator::StartsWith, Value::String(text.to_string()))
    }

    pub fn ends_with(text: &str) -> Self {
        Self::new(QueryOperator::EndsWith, Value::String(text.to_string()))
    }

    /// Case-insensitive matching for text operators
    pub fn insensitive(mut self) -> Self {
        self.mode = QueryMode::Insensitive;
        self
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.operator.key().to_string(), self.value.clone());
        if self.mode == QueryMode::Insensitive {
            map.insert("mode".to_string(), Value::String("insensitive".to_string()));
        }
        Value::Object(map)
    }
}

/// What a field of a [`Filter`] is constrained by
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    Condition(Condition),
    /// Constraint on the related record(s) reached through this field
    Relation(Filter),
}

impl FieldFilter {
    pub fn to_value(&self) -> Value {
        match self {
            FieldFilter::Condition(condition) => condition.to_value(),
            FieldFilter::Relation(filter) => filter.to_value(),
        }
    }
}

/// Predicate tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: BTreeMap<String, FieldFilter>,
    or: Option<Vec<Filter>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain a field; replaces any previous constraint on it
    pub fn condition(mut self, field: &str, condition: Condition) -> Self {
        self.set(field, FieldFilter::Condition(condition));
        self
    }

    /// Equality shorthand
    pub fn eq(self, field: &str, value: Value) -> Self {
        self.condition(field, Condition::equals(value))
    }

    /// Constrain the related record(s) reached through `field`
    pub fn relation(mut self, field: &str, filter: Filter) -> Self {
        self.set(field, FieldFilter::Relation(filter));
        self
    }

    /// Set the alternative branch, replacing any existing one
    pub fn or(mut self, alternatives: Vec<Filter>) -> Self {
        self.or = Some(alternatives);
        self
    }

    /// Build the single-key nesting for a dot path: `["category", "name"]` becomes
    /// `{ category: { name: <condition> } }`. Returns `None` for an empty path.
    pub fn at_path<S: AsRef<str>>(path: &[S], condition: Condition) -> Option<Filter> {
        let (last, parents) = path.split_last()?;
        let leaf = Filter::new().condition(last.as_ref(), condition);
        Some(
            parents
                .iter()
                .rev()
                .fold(leaf, |inner, segment| Filter::new().relation(segment.as_ref(), inner)),
        )
    }

    pub fn set(&mut self, field: &str, filter: FieldFilter) {
        self.fields.insert(field.to_string(), filter);
    }

    pub fn get(&self, field: &str) -> Option<&FieldFilter> {
        self.fields.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldFilter> {
        self.fields.remove(field)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldFilter)> {
        self.fields.iter()
    }

    pub fn or_branch(&self) -> Option<&[Filter]> {
        self.or.as_deref()
    }

    pub fn set_or(&mut self, alternatives: Vec<Filter>) {
        self.or = Some(alternatives);
    }

    pub fn take_or(&mut self) -> Option<Vec<Filter>> {
        self.or.take()
    }

    /// No field constraints and no alternative branch: matches everything
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.or.is_none()
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (field, filter) in &self.fields {
            map.insert(field.clone(), filter.to_value());
        }
        if let Some(alternatives) = &self.or {
            map.insert(
                OR_KEY.to_string(),
                Value::Array(alternatives.iter().map(Filter::to_value).collect()),
            );
        }
        Value::Object(map)
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
