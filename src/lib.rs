//! # CrudHaus
//!
//! A generic data-access layer for PostgreSQL: one typed CRUD engine for every entity,
//! pagination with ordering and search composed from request parameters, and
//! request-scoped transaction propagation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crudhaus::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Entity)]
//! #[entity(model = "product")]
//! pub struct Product {
//!     pub id: i64,
//!     pub name: String,
//!     #[soft_delete]
//!     pub deleted_at: Option<String>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let crudhaus = CrudHaus::connect(config).await?;
//!
//!     let products = crudhaus.store::<Product>();
//!     let created = products
//!         .create(Payload::new().set("name", "Phone"), &FindOptions::new())
//!         .await?;
//!
//!     let params = PaginationParams::new().search("phone").order("name:asc");
//!     let page = products
//!         .find_all(Filter::new(), &FindOptions::new(), &["name"], Vec::new(), &params)
//!         .await?;
//!     println!("{} of {} products", page.count, page.total_count);
//!
//!     // Both writes commit together or not at all
//!     crudhaus
//!         .transaction(|| async {
//!             products.update(created.id, Payload::new().set("name", "Phone X"), &FindOptions::new()).await?;
//!             products.delete(created.id).await?;
//!             Ok::<_, CrudHausError>(())
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use core::CrudHaus;
pub use errors::CrudHausError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, PaginationConfig, TransactionConfig, TransactionPolicy};

// Re-export internal crates used by macros and public API
// These MUST be public for the generated macro code to work correctly
pub use entity_derive;
pub use store_object;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
