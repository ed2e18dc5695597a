//! Model registry of the Postgres adapter
//!
//! Maps model names to tables and describes the relations nested predicates,
//! nested ordering and `include` may traverse. Columns may declare their SQL type;
//! filter values compared against a declared column are sent as text and cast to that
//! type, otherwise the bound type is inferred from the value.

use crate::errors::StoreError;
use crate::validation::{ValidatedIdentifier, ValidationError};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// At most one related row (many-to-one / one-to-one)
    One,
    /// Any number of related rows
    Many,
}

/// Join description: `target.foreign_key = source.local_key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgRelation {
    pub target: String,
    pub kind: RelationKind,
    pub local_key: ValidatedIdentifier,
    pub foreign_key: ValidatedIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgModel {
    pub name: String,
    pub table: ValidatedIdentifier,
    pub primary_key: ValidatedIdentifier,
    relations: HashMap<String, PgRelation>,
    column_types: HashMap<String, String>,
}

impl PgModel {
    /// Model stored in `table` with primary key `id`
    pub fn new(name: &str, table: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            name: name.to_string(),
            table: ValidatedIdentifier::new(table)?,
            primary_key: ValidatedIdentifier::new("id")?,
            relations: HashMap::new(),
            column_types: HashMap::new(),
        })
    }

    pub fn primary_key(mut self, column: &str) -> Result<Self, ValidationError> {
        self.primary_key = ValidatedIdentifier::new(column)?;
        Ok(self)
    }

    pub fn relation(
        mut self,
        name: &str,
        target: &str,
        kind: RelationKind,
        local_key: &str,
        foreign_key: &str,
    ) -> Result<Self, ValidationError> {
        ValidatedIdentifier::new(name)?;
        self.relations.insert(
            name.to_string(),
            PgRelation {
                target: target.to_string(),
                kind,
                local_key: ValidatedIdentifier::new(local_key)?,
                foreign_key: ValidatedIdentifier::new(foreign_key)?,
            },
        );
        Ok(self)
    }

    /// Declare the SQL type of `column`, e.g. `text`, `uuid`, `timestamptz`, `varchar(64)`
    pub fn column_type(mut self, column: &str, sql_type: &str) -> Result<Self, ValidationError> {
        ValidatedIdentifier::new(column)?;
        validate_sql_type(sql_type)?;
        self.column_types
            .insert(column.to_string(), sql_type.trim().to_string());
        Ok(self)
    }

    pub fn get_column_type(&self, column: &str) -> Option<&str> {
        self.column_types.get(column).map(String::as_str)
    }

    /// `local_key` on this table references `id` of `target`
    pub fn belongs_to(self, name: &str, target: &str, local_key: &str) -> Result<Self, ValidationError> {
        self.relation(name, target, RelationKind::One, local_key, "id")
    }

    /// `foreign_key` on `target` references this model's primary key
    pub fn has_many(self, name: &str, target: &str, foreign_key: &str) -> Result<Self, ValidationError> {
        let local_key = self.primary_key.as_str().to_string();
        self.relation(name, target, RelationKind::Many, &local_key, foreign_key)
    }

    pub fn get_relation(&self, name: &str) -> Result<&PgRelation, StoreError> {
        self.relations.get(name).ok_or_else(|| {
            StoreError::Validation(format!("model '{}' has no relation '{}'", self.name, name))
        })
    }
}

/// Type names are spliced into SQL casts, so only the characters type names use pass
fn validate_sql_type(sql_type: &str) -> Result<(), ValidationError> {
    let trimmed = sql_type.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    if !trimmed.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return Err(ValidationError::InvalidStartCharacter(sql_type.to_string()));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '(' | ')' | ',' | '[' | ']');
    if !trimmed.chars().all(allowed) {
        return Err(ValidationError::InvalidCharacters(sql_type.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct PgSchema {
    models: HashMap<String, PgModel>,
}

impl PgSchema {
    pub fn register(&mut self, model: PgModel) {
        self.models.insert(model.name.clone(), model);
    }

    pub fn model(&self, name: &str) -> Result<&PgModel, StoreError> {
        self.models
            .get(name)
            .ok_or_else(|| StoreError::UnknownModel(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_types_are_validated() {
        let model = PgModel::new("product", "products")
            .unwrap()
            .column_type("slug", "text")
            .unwrap()
            .column_type("code", "varchar(64)")
            .unwrap();

        assert_eq!(model.get_column_type("slug"), Some("text"));
        assert_eq!(model.get_column_type("code"), Some("varchar(64)"));
        assert_eq!(model.get_column_type("name"), None);

        let injected = PgModel::new("product", "products")
            .unwrap()
            .column_type("slug", "text); DROP TABLE products; --");
        assert!(matches!(injected, Err(ValidationError::InvalidCharacters(_))));
        assert!(PgModel::new("product", "products")
            .unwrap()
            .column_type("slug", " ")
            .is_err());
    }
}
