//! Database models

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::any::AnyRow;

/// A value bound into a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

/// A row type stored in one table, keyed by a caller-supplied integer id.
///
/// The table and column names are compile-time constants and are the only
/// parts of a statement that are not bound parameters.
pub trait Entity:
    Serialize
    + DeserializeOwned
    + for<'r> TryFrom<&'r AnyRow, Error = sqlx::Error>
    + Clone
    + Send
    + Sync
    + Unpin
    + 'static
{
    /// The mutable fields of the entity, each optional
    type Changes: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static;

    /// Table holding the rows
    const TABLE: &'static str;
    /// Singular name used in messages
    const KIND: &'static str;
    /// All columns, `id` first
    const COLUMNS: &'static [&'static str];
    /// Text columns that must not be blank
    const REQUIRED: &'static [&'static str];

    fn id(&self) -> i64;

    /// Values for every column, in `COLUMNS` order
    fn values(&self) -> Vec<SqlValue>;

    /// Column assignments for the fields named in a change set
    fn assignments(changes: &Self::Changes) -> Vec<(&'static str, SqlValue)>;
}

/// Author model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub bio: String,
}

/// Update author (for partial updates)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Genre model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Update genre (for partial updates)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Book model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    /// References `authors.id`
    pub author_id: i64,
    /// References `genres.id`
    pub genre_id: i64,
    pub published_year: i64,
    pub description: String,
}

/// Update book (for partial updates)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Push `column = value` when the field is named
fn assign<T: Into<SqlValue> + Clone>(
    out: &mut Vec<(&'static str, SqlValue)>,
    column: &'static str,
    value: &Option<T>,
) {
    if let Some(value) = value {
        out.push((column, value.clone().into()));
    }
}

// ==================== Entity Implementations ====================

impl Entity for Author {
    type Changes = AuthorChanges;

    const TABLE: &'static str = "authors";
    const KIND: &'static str = "author";
    const COLUMNS: &'static [&'static str] = &["id", "name", "bio"];
    const REQUIRED: &'static [&'static str] = &["name"];

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.into(),
            self.name.clone().into(),
            self.bio.clone().into(),
        ]
    }

    fn assignments(changes: &AuthorChanges) -> Vec<(&'static str, SqlValue)> {
        let mut out = Vec::new();
        assign(&mut out, "name", &changes.name);
        assign(&mut out, "bio", &changes.bio);
        out
    }
}

impl Entity for Genre {
    type Changes = GenreChanges;

    const TABLE: &'static str = "genres";
    const KIND: &'static str = "genre";
    const COLUMNS: &'static [&'static str] = &["id", "name"];
    const REQUIRED: &'static [&'static str] = &["name"];

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.id.into(), self.name.clone().into()]
    }

    fn assignments(changes: &GenreChanges) -> Vec<(&'static str, SqlValue)> {
        let mut out = Vec::new();
        assign(&mut out, "name", &changes.name);
        out
    }
}

impl Entity for Book {
    type Changes = BookChanges;

    const TABLE: &'static str = "books";
    const KIND: &'static str = "book";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "author_id",
        "genre_id",
        "published_year",
        "description",
    ];
    const REQUIRED: &'static [&'static str] = &["title"];

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.into(),
            self.title.clone().into(),
            self.author_id.into(),
            self.genre_id.into(),
            self.published_year.into(),
            self.description.clone().into(),
        ]
    }

    fn assignments(changes: &BookChanges) -> Vec<(&'static str, SqlValue)> {
        let mut out = Vec::new();
        assign(&mut out, "title", &changes.title);
        assign(&mut out, "author_id", &changes.author_id);
        assign(&mut out, "genre_id", &changes.genre_id);
        assign(&mut out, "published_year", &changes.published_year);
        assign(&mut out, "description", &changes.description);
        out
    }
}

// ==================== TryFrom Implementations ====================

impl TryFrom<&AnyRow> for Author {
    type Error = sqlx::Error;

    fn try_from(row: &AnyRow) -> Result<Self, Self::Error> {
        Ok(Author {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            bio: row.try_get("bio")?,
        })
    }
}

impl TryFrom<&AnyRow> for Genre {
    type Error = sqlx::Error;

    fn try_from(row: &AnyRow) -> Result<Self, Self::Error> {
        Ok(Genre {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

impl TryFrom<&AnyRow> for Book {
    type Error = sqlx::Error;

    fn try_from(row: &AnyRow) -> Result<Self, Self::Error> {
        Ok(Book {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author_id: row.try_get("author_id")?,
            genre_id: row.try_get("genre_id")?,
            published_year: row.try_get("published_year")?,
            description: row.try_get("description")?,
        })
    }
}
