//! Ordered seed import
//!
//! Books reference authors and genres, so the stages run in an explicit
//! order and that order is checked against each stage's dependencies
//! before anything is written. A failed insert stops the job; rows already
//! inserted stay in the store.

use std::fmt;

use bookshelf_db::{Database, Entity, Repository};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ImportError;
use crate::seed::{SeedSet, SeedSources};

/// One step of the import, covering a single table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStage {
    Authors,
    Genres,
    Books,
}

impl ImportStage {
    /// The order stages run in
    pub const ORDER: [ImportStage; 3] = [
        ImportStage::Authors,
        ImportStage::Genres,
        ImportStage::Books,
    ];

    /// Stages whose rows must exist before this one runs
    pub fn depends_on(&self) -> &'static [ImportStage] {
        match self {
            ImportStage::Authors | ImportStage::Genres => &[],
            ImportStage::Books => &[ImportStage::Authors, ImportStage::Genres],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStage::Authors => "authors",
            ImportStage::Genres => "genres",
            ImportStage::Books => "books",
        }
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that every stage comes after the stages it depends on
pub fn check_order(order: &[ImportStage]) -> Result<(), ImportError> {
    for (position, stage) in order.iter().enumerate() {
        for dependency in stage.depends_on() {
            if !order[..position].contains(dependency) {
                return Err(ImportError::Order {
                    stage: *stage,
                    dependency: *dependency,
                });
            }
        }
    }
    Ok(())
}

/// Rows inserted per stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub authors: usize,
    pub genres: usize,
    pub books: usize,
}

impl ImportReport {
    /// What a full run of `seeds` would insert
    pub fn planned(seeds: &SeedSet) -> Self {
        Self {
            authors: seeds.authors.len(),
            genres: seeds.genres.len(),
            books: seeds.books.len(),
        }
    }

    pub fn get(&self, stage: ImportStage) -> usize {
        match stage {
            ImportStage::Authors => self.authors,
            ImportStage::Genres => self.genres,
            ImportStage::Books => self.books,
        }
    }

    pub fn total(&self) -> usize {
        self.authors + self.genres + self.books
    }

    fn record(&mut self, stage: ImportStage, inserted: usize) {
        match stage {
            ImportStage::Authors => self.authors = inserted,
            ImportStage::Genres => self.genres = inserted,
            ImportStage::Books => self.books = inserted,
        }
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} authors, {} genres, {} books",
            self.authors, self.genres, self.books
        )
    }
}

/// One-shot loader that populates the store from seed collections
pub struct ImportJob {
    db: Database,
}

impl ImportJob {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Load the sources, then import them
    pub async fn run_from(&self, sources: &SeedSources) -> Result<ImportReport, ImportError> {
        let seeds = SeedSet::load(sources).await?;
        self.run(&seeds).await
    }

    /// Insert every seed record, stage by stage
    ///
    /// Not idempotent: running it again against the same store fails on the
    /// first id that already exists.
    pub async fn run(&self, seeds: &SeedSet) -> Result<ImportReport, ImportError> {
        check_order(&ImportStage::ORDER)?;

        for dangling in seeds.dangling_references() {
            warn!("{}; the store must already contain it", dangling);
        }

        let mut report = ImportReport::default();
        for stage in ImportStage::ORDER {
            info!("Importing {}", stage);
            let inserted = match stage {
                ImportStage::Authors => {
                    insert_all(&self.db.authors(), stage, &seeds.authors, &report).await?
                }
                ImportStage::Genres => {
                    insert_all(&self.db.genres(), stage, &seeds.genres, &report).await?
                }
                ImportStage::Books => {
                    insert_all(&self.db.books(), stage, &seeds.books, &report).await?
                }
            };
            report.record(stage, inserted);
            info!("Imported {} {}", report.get(stage), stage);
        }

        info!("Import completed: {}", report);
        Ok(report)
    }
}

async fn insert_all<E: Entity>(
    repository: &Repository<E>,
    stage: ImportStage,
    records: &[E],
    completed: &ImportReport,
) -> Result<usize, ImportError> {
    for (inserted, record) in records.iter().enumerate() {
        if let Err(source) = repository.create(record.clone()).await {
            let mut completed = *completed;
            completed.record(stage, inserted);
            return Err(ImportError::Insert {
                stage,
                id: record.id(),
                completed,
                source,
            });
        }
    }
    Ok(records.len())
}
