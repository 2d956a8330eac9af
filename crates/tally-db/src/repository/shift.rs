//! # Shift Repository
//!
//! SQLite operations for cashier shifts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use tally_core::{Shift, ShiftStatus};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::store::ShiftStore;

#[derive(Debug, FromRow)]
struct ShiftRow {
    id: String,
    status: ShiftStatus,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl From<ShiftRow> for Shift {
    fn from(row: ShiftRow) -> Self {
        Shift {
            id: row.id,
            status: row.status,
            opened_at: row.opened_at,
            closed_at: row.closed_at,
        }
    }
}

/// Repository for shift database operations.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    pub async fn insert(&self, shift: &Shift) -> DbResult<()> {
        debug!(id = %shift.id, "Inserting shift");

        sqlx::query(
            r#"
            INSERT INTO shifts (id, status, opened_at, closed_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&shift.id)
        .bind(shift.status)
        .bind(shift.opened_at)
        .bind(shift.closed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shift>> {
        let row: Option<ShiftRow> = sqlx::query_as(
            "SELECT id, status, opened_at, closed_at FROM shifts WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Shift::from))
    }

    pub async fn list(&self) -> DbResult<Vec<Shift>> {
        let rows: Vec<ShiftRow> =
            sqlx::query_as("SELECT id, status, opened_at, closed_at FROM shifts ORDER BY rowid")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Shift::from).collect())
    }

    /// Closes an open shift.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - shift doesn't exist
    /// * `Err(DbError::AlreadyClosed)` - shift was closed before
    pub async fn close(&self, id: &str, closed_at: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE shifts SET
                status = 'closed',
                closed_at = ?2
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(id)
        .bind(closed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish "missing" from "already closed"
            return match self.get_by_id(id).await? {
                Some(_) => Err(DbError::already_closed("Shift", id)),
                None => Err(DbError::not_found("Shift", id)),
            };
        }

        debug!(id = %id, "Shift closed");
        Ok(())
    }
}

#[async_trait]
impl ShiftStore for Database {
    async fn insert_shift(&self, shift: &Shift) -> DbResult<()> {
        self.shifts().insert(shift).await
    }

    async fn get_shift(&self, id: &str) -> DbResult<Option<Shift>> {
        self.shifts().get_by_id(id).await
    }

    async fn list_shifts(&self) -> DbResult<Vec<Shift>> {
        self.shifts().list().await
    }

    async fn close_shift(&self, id: &str, closed_at: DateTime<Utc>) -> DbResult<()> {
        self.shifts().close(id, closed_at).await
    }
}
