//! Bookshelf Core
//!
//! This crate provides the one-shot seed import for Bookshelf: reading the
//! seed collections from JSON files and inserting them into the store in
//! dependency order.

pub mod error;
pub mod import;
pub mod seed;

pub use error::ImportError;
pub use import::{ImportJob, ImportReport, ImportStage, check_order};
pub use seed::{DanglingReference, SeedSet, SeedSources};
