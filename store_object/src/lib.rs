//! Store Object - core data-access layer for Crudhaus
//!
//! Predicate, ordering and payload values, the query composer, the request-scoped
//! transaction context, the store adapter contract with its in-memory and Postgres
//! implementations, and the generic CRUD engine built on top of them.

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub mod adapter;
pub mod composer;
pub mod errors;
pub mod generic_store;
pub mod id_type;
pub mod prelude;
pub mod query_builder;
pub mod traits;
pub mod transaction;
pub mod validation;

pub use adapter::{FindManyArgs, MemoryStore, ModelDelegate, PgStore, StoreAdapter};
pub use composer::{PageRequest, QueryComposer};
pub use errors::{CompositionError, CrudError, CrudOperation, StoreError};
pub use generic_store::{CrudService, CrudStore};
pub use id_type::RecordId;
pub use query_builder::{
    Condition, Filter, FindOptions, GroupBy, OrderBy, PaginatedResult, PaginationParams, Payload,
    SortOrder,
};
pub use traits::Entity;
pub use transaction::TransactionContext;
pub use validation::ValidationError;
