//! Import error types

use std::path::PathBuf;

use bookshelf_db::DbError;
use thiserror::Error;

use crate::import::{ImportReport, ImportStage};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An insert failed; rows inserted before it are kept
    #[error("Failed to insert {stage} record {id}: {source}")]
    Insert {
        stage: ImportStage,
        id: i64,
        completed: ImportReport,
        #[source]
        source: DbError,
    },

    #[error("Import stage {stage} is ordered before its dependency {dependency}")]
    Order {
        stage: ImportStage,
        dependency: ImportStage,
    },
}
