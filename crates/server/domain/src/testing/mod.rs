//! Test doubles for the processor ports.
//!
//! [`ScriptedDb`] replays queued results and records every call;
//! [`RecordingPublisher`] keeps every published event in memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use todoflow_shared::TodoEvent;

use crate::event_bus::{EventPublisher, PublishError};
use crate::persistence::{DbExecutor, PersistenceError, RowScanner, ScanSlot, SqlParam};

// ============================================================================
// Scripted database
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Exec,
    QueryRow,
}

/// One call made against [`ScriptedDb`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub statement: String,
    pub params: Vec<SqlParam>,
}

/// Column value returned by a scripted row
#[derive(Debug, Clone, PartialEq)]
pub enum ScanValue {
    Text(String),
    Timestamp(DateTime<Utc>),
}

/// Database double answering from queues of scripted results.
///
/// An empty queue answers with an error, so an unexpected call fails the test
/// through the processor's failure path.
#[derive(Clone, Debug, Default)]
pub struct ScriptedDb {
    exec_results: Arc<Mutex<VecDeque<Result<u64, String>>>>,
    row_results: Arc<Mutex<VecDeque<Result<Vec<ScanValue>, String>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the affected-row count of the next `exec`
    pub async fn push_exec_rows(&self, rows: u64) {
        self.exec_results.lock().await.push_back(Ok(rows));
    }

    /// Queues a failure for the next `exec`
    pub async fn push_exec_error(&self, message: &str) {
        self.exec_results
            .lock()
            .await
            .push_back(Err(message.to_string()));
    }

    /// Queues the `(id, created_at)` row of the next `query_row`
    pub async fn push_created_row(&self, id: &str, created_at: DateTime<Utc>) {
        self.row_results.lock().await.push_back(Ok(vec![
            ScanValue::Text(id.to_string()),
            ScanValue::Timestamp(created_at),
        ]));
    }

    /// Queues a failure for the next `query_row`
    pub async fn push_row_error(&self, message: &str) {
        self.row_results
            .lock()
            .await
            .push_back(Err(message.to_string()));
    }

    /// Returns all recorded calls
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, kind: CallKind, statement: &str, params: &[SqlParam]) {
        self.calls.lock().await.push(RecordedCall {
            kind,
            statement: statement.to_string(),
            params: params.to_vec(),
        });
    }
}

#[async_trait]
impl DbExecutor for ScriptedDb {
    async fn exec(&self, statement: &str, params: &[SqlParam]) -> Result<u64, PersistenceError> {
        self.record(CallKind::Exec, statement, params).await;
        match self.exec_results.lock().await.pop_front() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(PersistenceError::new(message)),
            None => Err(PersistenceError::new("no scripted exec result")),
        }
    }

    async fn query_row(&self, statement: &str, params: &[SqlParam]) -> Box<dyn RowScanner> {
        self.record(CallKind::QueryRow, statement, params).await;
        let result = self
            .row_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err("no scripted row".to_string()));
        Box::new(ScriptedRowScanner { result })
    }
}

#[derive(Debug)]
struct ScriptedRowScanner {
    result: Result<Vec<ScanValue>, String>,
}

impl RowScanner for ScriptedRowScanner {
    fn scan(&mut self, slots: &mut [ScanSlot<'_>]) -> Result<(), PersistenceError> {
        let values = match &self.result {
            Ok(values) => values,
            Err(message) => return Err(PersistenceError::new(message.clone())),
        };

        if values.len() != slots.len() {
            return Err(PersistenceError::new(format!(
                "row has {} columns, {} slots given",
                values.len(),
                slots.len()
            )));
        }

        for (idx, (slot, value)) in slots.iter_mut().zip(values).enumerate() {
            match (slot, value) {
                (ScanSlot::Text(out), ScanValue::Text(v)) => **out = v.clone(),
                (ScanSlot::Timestamp(out), ScanValue::Timestamp(v)) => **out = *v,
                _ => {
                    return Err(PersistenceError::new(format!(
                        "column {} type mismatch",
                        idx
                    )));
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// Recording publisher
// ============================================================================

/// Publisher double keeping `(subject, event)` pairs in memory
#[derive(Clone, Debug, Default)]
pub struct RecordingPublisher {
    published: Arc<Mutex<Vec<(String, TodoEvent)>>>,
    attempts: Arc<Mutex<usize>>,
    fail_with: Option<String>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every call fails with a transport error
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Returns all successfully published events
    pub async fn published(&self) -> Vec<(String, TodoEvent)> {
        self.published.lock().await.clone()
    }

    /// Returns only the events, in publish order
    pub async fn events(&self) -> Vec<TodoEvent> {
        self.published
            .lock()
            .await
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// Number of publish calls, failed ones included
    pub async fn attempts(&self) -> usize {
        *self.attempts.lock().await
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, subject: &str, event: &TodoEvent) -> Result<(), PublishError> {
        *self.attempts.lock().await += 1;
        if let Some(message) = &self.fail_with {
            return Err(PublishError::Transport(message.clone()));
        }
        self.published
            .lock()
            .await
            .push((subject.to_string(), event.clone()));
        Ok(())
    }
}
