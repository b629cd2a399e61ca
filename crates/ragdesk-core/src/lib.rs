//! # ragdesk core
//!
//! Runtime-agnostic building blocks for ragdesk: recyclable request-scoped
//! context variables, data models, file-type tables, and the object storage
//! trait.
//!
//! This crate contains no tokio, sqlx, or HTTP dependencies.

pub mod context;
pub mod file_types;
pub mod models;
pub mod storage;
