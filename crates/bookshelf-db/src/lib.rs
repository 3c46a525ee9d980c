//! Bookshelf Database Layer
//!
//! This crate provides the relational data-access layer for Bookshelf:
//! the connection provider, schema migrations, the entity models and the
//! generic repository that issues parameterized statements against them.
//! MySQL and SQLite are both reachable through sqlx's `Any` driver.

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::{Backend, ConnectOptions, ConnectionStrategy, Database, Repository};

/// Re-export sqlx for driver error types
pub use sqlx;
