//! Seed sources
//!
//! Each source is a JSON array of objects carrying one entity's attributes.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use bookshelf_db::{Author, Book, Genre};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ImportError;

/// Default file name of the author collection
pub const AUTHORS_FILE: &str = "authors.json";
/// Default file name of the genre collection
pub const GENRES_FILE: &str = "genres.json";
/// Default file name of the book collection
pub const BOOKS_FILE: &str = "books.json";

/// Locations of the three seed collections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSources {
    pub authors: PathBuf,
    pub genres: PathBuf,
    pub books: PathBuf,
}

impl SeedSources {
    /// The default file names inside `dir`
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            authors: dir.join(AUTHORS_FILE),
            genres: dir.join(GENRES_FILE),
            books: dir.join(BOOKS_FILE),
        }
    }
}

/// A book field pointing at a row the seed set does not contain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub book_id: i64,
    pub column: &'static str,
    pub missing_id: i64,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "book {} has {} {} which is not in the seed set",
            self.book_id, self.column, self.missing_id
        )
    }
}

/// The parsed seed collections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSet {
    pub authors: Vec<Author>,
    pub genres: Vec<Genre>,
    pub books: Vec<Book>,
}

impl SeedSet {
    /// Read and parse every source; nothing is returned unless all three parse
    pub async fn load(sources: &SeedSources) -> Result<Self, ImportError> {
        Ok(Self {
            authors: read_collection(&sources.authors).await?,
            genres: read_collection(&sources.genres).await?,
            books: read_collection(&sources.books).await?,
        })
    }

    /// Book references that the seed set itself cannot satisfy
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let authors: HashSet<i64> = self.authors.iter().map(|a| a.id).collect();
        let genres: HashSet<i64> = self.genres.iter().map(|g| g.id).collect();

        let mut dangling = Vec::new();
        for book in &self.books {
            if !authors.contains(&book.author_id) {
                dangling.push(DanglingReference {
                    book_id: book.id,
                    column: "author_id",
                    missing_id: book.author_id,
                });
            }
            if !genres.contains(&book.genre_id) {
                dangling.push(DanglingReference {
                    book_id: book.id,
                    column: "genre_id",
                    missing_id: book.genre_id,
                });
            }
        }
        dangling
    }
}

async fn read_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ImportError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let records: Vec<T> = serde_json::from_str(&content).map_err(|source| ImportError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_from_dir_uses_default_names() {
        let sources = SeedSources::from_dir("/seed");
        assert_eq!(sources.authors, PathBuf::from("/seed/authors.json"));
        assert_eq!(sources.genres, PathBuf::from("/seed/genres.json"));
        assert_eq!(sources.books, PathBuf::from("/seed/books.json"));
    }

    #[tokio::test]
    async fn test_load_seed_set() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), AUTHORS_FILE, r#"[{"id": 1, "name": "A", "bio": "b"}]"#);
        write(dir.path(), GENRES_FILE, r#"[{"id": 1, "name": "Sci-Fi"}, {"id": 2, "name": "Drama"}]"#);
        write(
            dir.path(),
            BOOKS_FILE,
            r#"[{"id": 1, "title": "T", "author_id": 1, "genre_id": 2,
                 "published_year": 1999, "description": "d"}]"#,
        );

        let seeds = SeedSet::load(&SeedSources::from_dir(dir.path())).await.unwrap();
        assert_eq!(seeds.authors.len(), 1);
        assert_eq!(seeds.genres.len(), 2);
        assert_eq!(seeds.books[0].genre_id, 2);
        assert!(seeds.dangling_references().is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SeedSet::load(&SeedSources::from_dir(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Read { path, .. } if path.ends_with(AUTHORS_FILE)));
    }

    #[tokio::test]
    async fn test_record_missing_field_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), AUTHORS_FILE, r#"[{"id": 1, "name": "A"}]"#);
        write(dir.path(), GENRES_FILE, "[]");
        write(dir.path(), BOOKS_FILE, "[]");

        let err = SeedSet::load(&SeedSources::from_dir(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Parse { .. }));
    }

    #[test]
    fn test_dangling_references() {
        let seeds = SeedSet {
            authors: vec![Author {
                id: 1,
                name: "A".to_string(),
                bio: String::new(),
            }],
            genres: vec![],
            books: vec![Book {
                id: 10,
                title: "T".to_string(),
                author_id: 2,
                genre_id: 3,
                published_year: 2001,
                description: String::new(),
            }],
        };

        let dangling = seeds.dangling_references();
        assert_eq!(dangling.len(), 2);
        assert_eq!(
            dangling[0].to_string(),
            "book 10 has author_id 2 which is not in the seed set"
        );
        assert_eq!(dangling[1].column, "genre_id");
        assert_eq!(dangling[1].missing_id, 3);
    }
}
