//! Generic CRUD engine
//!
//! [`CrudStore`] implements the CRUD operations once for any [`crate::Entity`] over any
//! [`crate::adapter::StoreAdapter`]; [`CrudService`] layers overridable per-model hooks
//! on top of it.

pub mod core;
pub mod operations;
pub mod service;

#[cfg(test)]
mod tests;

pub use core::CrudStore;
pub use service::CrudService;
