//! Generic entity operations
//!
//! One repository shape serves every entity: the entity supplies its table,
//! columns and value binding, the repository supplies the statements.

use std::marker::PhantomData;

use sqlx::Row;
use sqlx::Any;
use sqlx::any::AnyArguments;
use sqlx::query::Query;
use tracing::debug;

use crate::error::DbError;
use crate::models::{Entity, SqlValue};
use crate::repository::Database;
use crate::utils::placeholders;

type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

fn bind_value(query: AnyQuery<'_>, value: SqlValue) -> AnyQuery<'_> {
    match value {
        SqlValue::Int(v) => query.bind(v),
        SqlValue::Text(v) => query.bind(v),
    }
}

/// Reject blank values in the entity's required text columns
fn check_required<'a, E: Entity>(
    fields: impl IntoIterator<Item = (&'static str, &'a SqlValue)>,
) -> Result<(), DbError> {
    for (column, value) in fields {
        if let SqlValue::Text(text) = value
            && E::REQUIRED.contains(&column)
            && text.trim().is_empty()
        {
            return Err(DbError::Validation(format!(
                "{} {} must not be blank",
                E::KIND,
                column
            )));
        }
    }
    Ok(())
}

/// CRUD operations over one entity's table
///
/// Every operation acquires its own connection and releases it on return.
pub struct Repository<E> {
    db: Database,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    /// List all rows in storage order
    pub async fn list(&self) -> Result<Vec<E>, DbError> {
        let sql = format!("SELECT {} FROM {}", E::COLUMNS.join(", "), E::TABLE);

        let mut conn = self.db.acquire().await?;
        let rows = self
            .db
            .timed(sqlx::query(&sql).fetch_all(&mut *conn))
            .await?;

        rows.iter()
            .map(|row| E::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Get a row by ID, if it exists
    pub async fn find(&self, id: i64) -> Result<Option<E>, DbError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?",
            E::COLUMNS.join(", "),
            E::TABLE
        );

        let mut conn = self.db.acquire().await?;
        let result = self
            .db
            .timed(sqlx::query(&sql).bind(id).fetch_optional(&mut *conn))
            .await?;

        result
            .map(|row| E::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// Get a row by ID
    pub async fn get(&self, id: i64) -> Result<E, DbError> {
        self.find(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("{} {} not found", E::KIND, id)))
    }

    /// Insert a new row with every column; the record's id is kept as given
    pub async fn create(&self, record: E) -> Result<E, DbError> {
        let values = record.values();
        check_required::<E>(E::COLUMNS.iter().copied().zip(values.iter()))?;

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            E::TABLE,
            E::COLUMNS.join(", "),
            placeholders(E::COLUMNS.len())
        );
        let query = values.into_iter().fold(sqlx::query(&sql), bind_value);

        let mut conn = self.db.acquire().await?;
        match self.db.timed(query.execute(&mut *conn)).await {
            Ok(_) => {
                debug!("Inserted {} {}", E::KIND, record.id());
                Ok(record)
            }
            Err(DbError::Duplicate(_)) => Err(DbError::Duplicate(format!(
                "{} {} already exists",
                E::KIND,
                record.id()
            ))),
            Err(DbError::ForeignKey(cause)) => Err(DbError::ForeignKey(format!(
                "{} {} references a missing row ({})",
                E::KIND,
                record.id(),
                cause
            ))),
            Err(e) => Err(e),
        }
    }

    /// Overwrite the fields named in `changes`; returns the number of rows affected
    ///
    /// An id with no row, or an empty change set, affects zero rows and still succeeds.
    pub async fn update(&self, id: i64, changes: &E::Changes) -> Result<u64, DbError> {
        let assignments = E::assignments(changes);
        check_required::<E>(assignments.iter().map(|(column, value)| (*column, value)))?;

        if assignments.is_empty() {
            debug!("No fields to update on {} {}", E::KIND, id);
            return Ok(0);
        }

        let set = assignments
            .iter()
            .map(|(column, _)| format!("{} = ?", column))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {} WHERE id = ?", E::TABLE, set);
        let query = assignments
            .into_iter()
            .fold(sqlx::query(&sql), |query, (_, value)| bind_value(query, value))
            .bind(id);

        let mut conn = self.db.acquire().await?;
        let result = match self.db.timed(query.execute(&mut *conn)).await {
            Ok(result) => result,
            Err(DbError::ForeignKey(cause)) => {
                return Err(DbError::ForeignKey(format!(
                    "{} {} references a missing row ({})",
                    E::KIND,
                    id,
                    cause
                )));
            }
            Err(e) => return Err(e),
        };

        debug!(
            "Updated {} {} ({} rows)",
            E::KIND,
            id,
            result.rows_affected()
        );
        Ok(result.rows_affected())
    }

    /// Delete a row by ID; returns the number of rows removed
    pub async fn delete(&self, id: i64) -> Result<u64, DbError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", E::TABLE);

        let mut conn = self.db.acquire().await?;
        let result = match self
            .db
            .timed(sqlx::query(&sql).bind(id).execute(&mut *conn))
            .await
        {
            Ok(result) => result,
            Err(DbError::ForeignKey(_)) => {
                return Err(DbError::ForeignKey(format!(
                    "{} {} is still referenced",
                    E::KIND,
                    id
                )));
            }
            Err(e) => return Err(e),
        };

        debug!(
            "Deleted {} {} ({} rows)",
            E::KIND,
            id,
            result.rows_affected()
        );
        Ok(result.rows_affected())
    }

    /// Count the rows in the table
    pub async fn count(&self) -> Result<i64, DbError> {
        let sql = format!("SELECT COUNT(*) AS count FROM {}", E::TABLE);

        let mut conn = self.db.acquire().await?;
        let row = self
            .db
            .timed(sqlx::query(&sql).fetch_one(&mut *conn))
            .await?;
        Ok(row.try_get("count")?)
    }
}
