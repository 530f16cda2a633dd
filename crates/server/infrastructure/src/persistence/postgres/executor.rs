//! sqlx-backed [`DbExecutor`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};
use todo_processor_domain::persistence::{
    DbExecutor, PersistenceError, RowScanner, ScanSlot, SqlParam,
};

/// Runs statements on a shared [`PgPool`].
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Text(v) => query.bind(v.clone()),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::Timestamp(v) => query.bind(*v),
            SqlParam::TextArray(v) => query.bind(v.clone()),
        };
    }
    query
}

#[async_trait]
impl DbExecutor for PgExecutor {
    async fn exec(&self, statement: &str, params: &[SqlParam]) -> Result<u64, PersistenceError> {
        let result = bind_params(sqlx::query(statement), params)
            .execute(&self.pool)
            .await
            .map_err(|e| PersistenceError::with_source("statement failed", e))?;

        Ok(result.rows_affected())
    }

    async fn query_row(&self, statement: &str, params: &[SqlParam]) -> Box<dyn RowScanner> {
        let row = bind_params(sqlx::query(statement), params)
            .fetch_one(&self.pool)
            .await
            .map_err(Some);

        Box::new(PgRowScanner { row })
    }
}

/// Holds a fetched row, or the deferred query error.
struct PgRowScanner {
    row: Result<PgRow, Option<sqlx::Error>>,
}

impl RowScanner for PgRowScanner {
    fn scan(&mut self, slots: &mut [ScanSlot<'_>]) -> Result<(), PersistenceError> {
        let row = match &mut self.row {
            Ok(row) => row,
            Err(e) => {
                return Err(match e.take() {
                    Some(source) => PersistenceError::with_source("query failed", source),
                    None => PersistenceError::new("query failed"),
                });
            }
        };

        for (idx, slot) in slots.iter_mut().enumerate() {
            match slot {
                ScanSlot::Text(out) => {
                    **out = row
                        .try_get::<String, _>(idx)
                        .map_err(|e| PersistenceError::with_source("scan text column", e))?;
                }
                ScanSlot::Timestamp(out) => {
                    **out = row
                        .try_get::<DateTime<Utc>, _>(idx)
                        .map_err(|e| PersistenceError::with_source("scan timestamp column", e))?;
                }
            }
        }

        Ok(())
    }
}
