//! Traits binding record types to the store
//!
//! This module contains the traits a record type implements to be served by the
//! generic CRUD engine.

pub mod entity;

pub use entity::Entity;
