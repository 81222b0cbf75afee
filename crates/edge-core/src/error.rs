//! Error taxonomy for the render worker.
//!
//! None of these are recovered locally: each one ends the worker process.

/// Error type for worker operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Unexpected message type: {0}")]
    ProtocolViolation(String),

    #[error("Layout metadata has no page module")]
    MissingPageModule,

    #[error("Rendering was not successful: no result returned")]
    EmptyRenderResult,

    #[error("Client module key '{0}' must be in the format ${{file}}#${{name}}")]
    InvalidClientModuleKey(String),

    #[error("Invalid module id '{id}': {reason}")]
    InvalidModuleId { id: String, reason: String },

    #[error("Render engine error: {0}")]
    Engine(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Streaming error: {0}")]
    Stream(String),
}

impl WorkerError {
    /// Stable name reported in the outbound error signal.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProtocolViolation(_) => "ProtocolViolation",
            Self::MissingPageModule => "MissingPageModule",
            Self::EmptyRenderResult => "EmptyRenderResult",
            Self::InvalidClientModuleKey(_) => "InvalidClientModuleKey",
            Self::InvalidModuleId { .. } => "InvalidModuleId",
            Self::Engine(_) => "EngineError",
            Self::Channel(_) => "ChannelError",
            Self::Stream(_) => "StreamError",
        }
    }

    /// Whether the error may still be reported over the channel.
    ///
    /// Protocol violations and channel failures terminate silently.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::ProtocolViolation(_) | Self::Channel(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(WorkerError::MissingPageModule.code(), "MissingPageModule");
        assert_eq!(
            WorkerError::ProtocolViolation("body".into()).code(),
            "ProtocolViolation"
        );
        assert_eq!(WorkerError::Engine("boom".into()).code(), "EngineError");
    }

    #[test]
    fn test_display() {
        let err = WorkerError::InvalidClientModuleKey("foo".into());
        assert_eq!(
            err.to_string(),
            "Client module key 'foo' must be in the format ${file}#${name}"
        );
        assert_eq!(
            WorkerError::ProtocolViolation("bodyChunk".into()).to_string(),
            "Unexpected message type: bodyChunk"
        );
    }

    #[test]
    fn test_reportable() {
        assert!(!WorkerError::ProtocolViolation("x".into()).is_reportable());
        assert!(!WorkerError::Channel("closed".into()).is_reportable());
        assert!(WorkerError::EmptyRenderResult.is_reportable());
    }
}
