//! Error types for the CrudHaus crate
//!
//! This module contains the errors the coordinator itself can return; CRUD operations
//! report [`store_object::CrudError`].

use config::ConfigError;
use store_object::{CrudError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrudHausError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Crud(#[from] CrudError),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Service already registered: {0}")]
    ServiceAlreadyRegistered(String),
}
