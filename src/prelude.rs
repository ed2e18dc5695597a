//! Convenience re-exports for common CrudHaus usage
//!
//! This prelude module re-exports the most commonly used items from the CrudHaus crates,
//! making it easier to import everything you need with a single use statement.
//!
//! # Example
//!
//! ```rust
//! use crudhaus::prelude::*;
//!
//! // Now you have access to all the common CrudHaus types and traits
//! ```

// Core CrudHaus components
pub use crate::core::CrudHaus;
pub use crate::errors::CrudHausError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, PaginationConfig, TransactionPolicy};

// Re-export commonly used store-object types for convenience
pub use store_object::prelude::*;

// Re-export store_object module for macro-generated code
pub use store_object;

// Re-export entity derive for model creation
pub use entity_derive::Entity;

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use sqlx;
pub use tokio;

// Commonly used sqlx types
pub use sqlx::PgPool;
