// Command Processing Error Types
//
// Error types returned by the todo command handlers.

use thiserror::Error;

use crate::event_bus::PublishError;
use crate::persistence::PersistenceError;

/// Error types for command handling
///
/// Every variant is reported after the matching failed event has been
/// published, except `Publish` itself.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Statement execution or row scan failed
    #[error("Persistence failure: {0}")]
    Persistence(#[from] PersistenceError),

    /// No row matched the (id, user id) key
    #[error("Todo {id} not found for user {user_id}")]
    NotFound {
        /// Todo id from the command
        id: String,
        /// Owner from the command
        user_id: String,
    },

    /// Outbound event could not be serialized or published
    #[error("Event publish failed: {0}")]
    Publish(#[from] PublishError),
}

impl ProcessorError {
    /// Short label used for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Persistence(_) => "persistence",
            Self::NotFound { .. } => "not_found",
            Self::Publish(_) => "publish",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ProcessorError::NotFound {
            id: "t1".to_string(),
            user_id: "u1".to_string(),
        };
        assert_eq!(err.to_string(), "Todo t1 not found for user u1");
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_from_conversions() {
        let err: ProcessorError = PersistenceError::new("connection refused").into();
        assert_eq!(err.kind(), "persistence");

        let err: ProcessorError = PublishError::Transport("no responders".to_string()).into();
        assert_eq!(err.kind(), "publish");
        assert!(err.to_string().contains("no responders"));
    }
}
