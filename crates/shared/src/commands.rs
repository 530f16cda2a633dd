//! Inbound todo commands.
//!
//! Commands arrive as JSON objects with a `type` discriminant. Decoding runs in
//! two phases: [`CommandEnvelope`] is read first to learn the discriminant, then
//! the same bytes are decoded into the matching concrete command. The set of
//! commands is closed; anything else is reported as
//! [`DecodeError::UnknownCommandType`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DecodeError;

/// Discriminant of an inbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandType {
    CreateTodo,
    UpdateTodo,
    DeleteTodo,
}

impl CommandType {
    pub const ALL: [CommandType; 3] = [Self::CreateTodo, Self::UpdateTodo, Self::DeleteTodo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTodo => "CreateTodo",
            Self::UpdateTodo => "UpdateTodo",
            Self::DeleteTodo => "DeleteTodo",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DecodeError::UnknownCommandType(s.to_string()))
    }
}

/// Todo priority as carried on the wire (`"low"`, `"medium"`, `"high"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Loosely typed first-phase view of a command, used only to route.
///
/// The discriminant is kept as a raw string so an unrecognized type can be
/// told apart from a malformed payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope {
    #[serde(rename = "type")]
    pub command_type: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl CommandEnvelope {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(payload).map_err(DecodeError::Envelope)
    }

    /// Resolves the raw discriminant against the closed set of commands.
    pub fn resolve_type(&self) -> Result<CommandType, DecodeError> {
        self.command_type.parse()
    }
}

/// Fields embedded in every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandBase {
    #[serde(rename = "type")]
    pub command_type: CommandType,
    /// Target todo id; empty for `CreateTodo`
    #[serde(default)]
    pub id: String,
    pub user_id: String,
}

impl CommandBase {
    pub fn new(command_type: CommandType, id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            command_type,
            id: id.into(),
            user_id: user_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoCommand {
    #[serde(flatten)]
    pub base: CommandBase,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl CreateTodoCommand {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            base: CommandBase::new(CommandType::CreateTodo, "", user_id),
            title: title.into(),
            description: None,
            due_date: None,
            priority: None,
            tags: None,
        }
    }
}

/// Partial update: every `None` field keeps the stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoCommand {
    #[serde(flatten)]
    pub base: CommandBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl UpdateTodoCommand {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            base: CommandBase::new(CommandType::UpdateTodo, id, user_id),
            title: None,
            description: None,
            completed: None,
            due_date: None,
            priority: None,
            tags: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTodoCommand {
    #[serde(flatten)]
    pub base: CommandBase,
}

impl DeleteTodoCommand {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            base: CommandBase::new(CommandType::DeleteTodo, id, user_id),
        }
    }
}

/// The closed set of commands this service understands.
#[derive(Debug, Clone, PartialEq)]
pub enum TodoCommand {
    Create(CreateTodoCommand),
    Update(UpdateTodoCommand),
    Delete(DeleteTodoCommand),
}

impl TodoCommand {
    /// Decodes a wire payload: envelope first, then the concrete command.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let envelope = CommandEnvelope::decode(payload)?;
        let command_type = envelope.resolve_type()?;
        Self::decode_as(command_type, payload)
    }

    /// Decodes `payload` as the concrete command selected by `command_type`.
    pub fn decode_as(command_type: CommandType, payload: &[u8]) -> Result<Self, DecodeError> {
        let into_error = move |source: serde_json::Error| DecodeError::Payload {
            command_type,
            source,
        };
        match command_type {
            CommandType::CreateTodo => serde_json::from_slice(payload)
                .map(Self::Create)
                .map_err(into_error),
            CommandType::UpdateTodo => serde_json::from_slice(payload)
                .map(Self::Update)
                .map_err(into_error),
            CommandType::DeleteTodo => serde_json::from_slice(payload)
                .map(Self::Delete)
                .map_err(into_error),
        }
    }

    pub fn base(&self) -> &CommandBase {
        match self {
            Self::Create(cmd) => &cmd.base,
            Self::Update(cmd) => &cmd.base,
            Self::Delete(cmd) => &cmd.base,
        }
    }

    /// Type implied by the variant, independent of the embedded base.
    pub fn command_type(&self) -> CommandType {
        match self {
            Self::Create(_) => CommandType::CreateTodo,
            Self::Update(_) => CommandType::UpdateTodo,
            Self::Delete(_) => CommandType::DeleteTodo,
        }
    }
}
