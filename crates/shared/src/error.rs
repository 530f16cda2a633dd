use crate::commands::CommandType;

/// Errors raised while turning wire bytes into a [`crate::TodoCommand`].
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("invalid command envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("unknown command type: {0}")]
    UnknownCommandType(String),

    #[error("invalid {command_type} payload: {source}")]
    Payload {
        command_type: CommandType,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Short label used for log fields and metric labels
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Envelope(_) => "decode",
            Self::UnknownCommandType(_) => "unknown_type",
            Self::Payload { .. } => "decode",
        }
    }
}
