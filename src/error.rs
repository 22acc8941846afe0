// Error kinds shared by the engine boundary, the collectors and the run loop.

use thiserror::Error;

/// Failure reported by the engine API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The daemon answered with an error status (e.g. "No such container").
    #[error("Error response from daemon: {message}")]
    Api { status: u16, message: String },
    /// A frame on an otherwise healthy stream could not be decoded.
    #[error("decoding stats: {0}")]
    Decode(String),
    /// The connection to the daemon was cut mid-response (daemon restart).
    #[error("unexpected EOF")]
    Disconnected,
    #[error("{0}")]
    Transport(String),
}

impl EngineError {
    /// A disconnect during shutdown is treated as a clean stop.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, EngineError::Disconnected)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::Api { status: 404, .. })
    }
}

/// Error stored on a monitored entity's record and shown as placeholder cells.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The metric stream ended; the row is dropped on the next render pass.
    #[error("EOF")]
    EndOfStream,
    #[error("timeout waiting for stats")]
    Timeout,
}

impl EntityError {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, EntityError::EndOfStream)
    }
}

/// Errors that abort a whole monitoring run.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// One or more explicitly named entities failed the initial probe.
    #[error("{0}")]
    Preflight(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("writing to terminal: {0}")]
    Io(#[from] std::io::Error),
}
