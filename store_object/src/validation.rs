//! Validation module
//!
//! Identifiers that end up interpolated into SQL (table, column and relation names)
//! are validated here; values always travel as bound parameters.

use std::fmt;

/// Validation errors for database identifiers
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Name contains invalid characters (only alphanumeric and underscore allowed)
    InvalidCharacters(String),
    /// Name is too long (PostgreSQL limit is 63 characters)
    TooLong {
        name: String,
        length: usize,
        max_length: usize,
    },
    /// Name is empty
    Empty,
    /// Name starts with invalid character (must start with letter or underscore)
    InvalidStartCharacter(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCharacters(name) => {
                write!(f, "Invalid characters in name '{}': only alphanumeric characters and underscores are allowed", name)
            }
            ValidationError::TooLong {
                name,
                length,
                max_length,
            } => {
                write!(
                    f,
                    "Name '{}' is too long: {} characters (max {})",
                    name, length, max_length
                )
            }
            ValidationError::Empty => {
                write!(f, "Name cannot be empty")
            }
            ValidationError::InvalidStartCharacter(name) => {
                write!(f, "Name '{}' must start with a letter or underscore", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// A validated SQL identifier; always rendered double-quoted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedIdentifier(String);

impl ValidatedIdentifier {
    /// PostgreSQL identifier length limit
    const MAX_LENGTH: usize = 63;

    pub fn new(name: &str) -> Result<Self, ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::Empty);
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(ValidationError::TooLong {
                name: name.to_string(),
                length: name.len(),
                max_length: Self::MAX_LENGTH,
            });
        }

        let first_char = name.chars().next().ok_or(ValidationError::Empty)?;
        if !first_char.is_ascii_alphabetic() && first_char != '_' {
            return Err(ValidationError::InvalidStartCharacter(name.to_string()));
        }

        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ValidationError::InvalidCharacters(name.to_string()));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form; quoting keeps reserved words like `order` usable
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for ValidatedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate and quote in one step
pub fn quote_identifier(name: &str) -> Result<String, ValidationError> {
    ValidatedIdentifier::new(name).map(|ident| ident.quoted())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert_eq!(quote_identifier("users").unwrap(), "\"users\"");
        assert_eq!(quote_identifier("_private").unwrap(), "\"_private\"");
        assert_eq!(quote_identifier("order").unwrap(), "\"order\"");
        assert_eq!(quote_identifier("deleted_at2").unwrap(), "\"deleted_at2\"");
    }

    #[test]
    fn test_invalid_identifiers() {
        assert_eq!(ValidatedIdentifier::new(""), Err(ValidationError::Empty));
        assert!(matches!(
            ValidatedIdentifier::new("2fa"),
            Err(ValidationError::InvalidStartCharacter(_))
        ));
        assert!(matches!(
            ValidatedIdentifier::new("name\"; DROP TABLE users; --"),
            Err(ValidationError::InvalidCharacters(_))
        ));
        assert!(matches!(
            ValidatedIdentifier::new(&"a".repeat(64)),
            Err(ValidationError::TooLong { length: 64, .. })
        ));
    }
}
