//! Persistence capability port.
//!
//! The processor talks to the relational store only through [`DbExecutor`]:
//! `exec` for statements that report an affected-row count, and `query_row`
//! for single-row queries whose columns are read back positionally through a
//! [`RowScanner`]. Errors are opaque; the adapter neither retries nor
//! classifies them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use std::fmt;

/// A positional statement parameter.
///
/// `None` binds SQL `NULL` of the matching type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(Option<String>),
    Bool(Option<bool>),
    Timestamp(Option<DateTime<Utc>>),
    TextArray(Option<Vec<String>>),
}

impl SqlParam {
    pub fn is_null(&self) -> bool {
        match self {
            Self::Text(v) => v.is_none(),
            Self::Bool(v) => v.is_none(),
            Self::Timestamp(v) => v.is_none(),
            Self::TextArray(v) => v.is_none(),
        }
    }
}

/// Caller-owned output slot filled by [`RowScanner::scan`].
#[derive(Debug)]
pub enum ScanSlot<'a> {
    Text(&'a mut String),
    Timestamp(&'a mut DateTime<Utc>),
}

/// Opaque store failure.
#[derive(Debug)]
pub struct PersistenceError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl PersistenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => f.write_str(&self.message),
        }
    }
}

impl StdError for PersistenceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// Result of a single-row query.
///
/// A failed query still yields a scanner; the failure is reported by `scan`.
pub trait RowScanner: Send {
    /// Copies the row's columns, in order, into `slots`.
    fn scan(&mut self, slots: &mut [ScanSlot<'_>]) -> Result<(), PersistenceError>;
}

/// Narrow database capability consumed by the processor.
#[async_trait]
pub trait DbExecutor: Send + Sync {
    /// Executes a statement and returns the number of affected rows.
    async fn exec(&self, statement: &str, params: &[SqlParam]) -> Result<u64, PersistenceError>;

    /// Runs a query expected to return exactly one row.
    async fn query_row(&self, statement: &str, params: &[SqlParam]) -> Box<dyn RowScanner>;
}
