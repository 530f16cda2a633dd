//! Outbound todo events.
//!
//! Every processed command yields exactly one of six event shapes, tagged by a
//! `type` field on the wire. All shapes carry `id`, `userId` and `timestamp`;
//! the success shapes for create and update echo the written fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::commands::Priority;

/// Discriminant of an outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    TodoCreated,
    TodoCreateFailed,
    TodoUpdated,
    TodoUpdateFailed,
    TodoDeleted,
    TodoDeleteFailed,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TodoCreated => "TodoCreated",
            Self::TodoCreateFailed => "TodoCreateFailed",
            Self::TodoUpdated => "TodoUpdated",
            Self::TodoUpdateFailed => "TodoUpdateFailed",
            Self::TodoDeleted => "TodoDeleted",
            Self::TodoDeleteFailed => "TodoDeleteFailed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::TodoCreateFailed | Self::TodoUpdateFailed | Self::TodoDeleteFailed
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by every event. Also the full payload of the deleted and
/// failed shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBase {
    pub id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

impl EventBase {
    /// Base stamped with the current instant.
    pub fn now(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoCreatedEvent {
    /// Store-assigned id
    pub id: String,
    pub user_id: String,
    /// Store-assigned creation instant
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
}

/// Echo of an applied update.
///
/// Fields reflect the request, not the stored row: an absent title or
/// description is reported as `""`, absent tags as `[]` and an absent
/// completion flag as `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoUpdatedEvent {
    pub id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
}

/// The closed set of events this service emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TodoEvent {
    TodoCreated(TodoCreatedEvent),
    TodoCreateFailed(EventBase),
    TodoUpdated(TodoUpdatedEvent),
    TodoUpdateFailed(EventBase),
    TodoDeleted(EventBase),
    TodoDeleteFailed(EventBase),
}

impl TodoEvent {
    /// A failed create has no id; only the requesting user is known.
    pub fn create_failed(user_id: impl Into<String>) -> Self {
        Self::TodoCreateFailed(EventBase::now("", user_id))
    }

    pub fn update_failed(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::TodoUpdateFailed(EventBase::now(id, user_id))
    }

    pub fn deleted(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::TodoDeleted(EventBase::now(id, user_id))
    }

    pub fn delete_failed(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::TodoDeleteFailed(EventBase::now(id, user_id))
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::TodoCreated(_) => EventType::TodoCreated,
            Self::TodoCreateFailed(_) => EventType::TodoCreateFailed,
            Self::TodoUpdated(_) => EventType::TodoUpdated,
            Self::TodoUpdateFailed(_) => EventType::TodoUpdateFailed,
            Self::TodoDeleted(_) => EventType::TodoDeleted,
            Self::TodoDeleteFailed(_) => EventType::TodoDeleteFailed,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::TodoCreated(e) => &e.id,
            Self::TodoUpdated(e) => &e.id,
            Self::TodoCreateFailed(b)
            | Self::TodoUpdateFailed(b)
            | Self::TodoDeleted(b)
            | Self::TodoDeleteFailed(b) => &b.id,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Self::TodoCreated(e) => &e.user_id,
            Self::TodoUpdated(e) => &e.user_id,
            Self::TodoCreateFailed(b)
            | Self::TodoUpdateFailed(b)
            | Self::TodoDeleted(b)
            | Self::TodoDeleteFailed(b) => &b.user_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::TodoCreated(e) => e.timestamp,
            Self::TodoUpdated(e) => e.timestamp,
            Self::TodoCreateFailed(b)
            | Self::TodoUpdateFailed(b)
            | Self::TodoDeleted(b)
            | Self::TodoDeleteFailed(b) => b.timestamp,
        }
    }
}
