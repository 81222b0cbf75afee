//! Channel error types.

use std::io::ErrorKind;

use edge_core::WorkerError;
use thiserror::Error;

/// Errors that can occur on the channel.
#[derive(Error, Debug)]
pub enum IpcError {
    /// Transport failure, including a frame cut short.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame body is not a valid message.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame length above `MAX_FRAME_LEN`.
    #[error("Frame of {0} bytes exceeds the frame size limit")]
    FrameTooLarge(usize),

    /// The other side went away.
    #[error("Channel closed")]
    Closed,
}

impl IpcError {
    /// Classify a write failure. A peer that hung up closes the channel.
    pub(crate) fn on_write(err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => IpcError::Closed,
            _ => IpcError::Io(err),
        }
    }
}

impl From<IpcError> for WorkerError {
    fn from(err: IpcError) -> Self {
        WorkerError::Channel(err.to_string())
    }
}
