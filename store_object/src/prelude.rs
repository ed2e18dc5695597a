//! Convenience re-exports for common store-object usage

// Engine and services
pub use crate::generic_store::{CrudService, CrudStore};
pub use crate::traits::Entity;

// Stores
pub use crate::adapter::{MemoryStore, ModelDelegate, PgModel, PgStore, StoreAdapter};

// Query values
pub use crate::query_builder::{
    Condition, Filter, FindOptions, GroupBy, GroupRow, OrderBy, PaginatedResult,
    PaginationParams, Payload, SortOrder,
};
pub use crate::composer::QueryComposer;
pub use crate::id_type::RecordId;
pub use crate::transaction::TransactionContext;

// Error types
pub use crate::errors::{CompositionError, CrudError, CrudOperation, StoreError};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use serde_json::{json, Value};
