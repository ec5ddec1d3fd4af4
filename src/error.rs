use thiserror::Error;

/// Reasons a pushed payload is refused as a frame.
///
/// Any of these rejects the whole message; no detector result from it is kept.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("invalid frame json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("detector '{detector}' detection {index}: confidence {value} outside [0, 1]")]
    ConfidenceOutOfRange {
        detector: String,
        index: usize,
        value: f64,
    },

    #[error("detector '{detector}' detection {index}: {field} is not finite")]
    NonFinite {
        detector: String,
        index: usize,
        field: &'static str,
    },
}

/// Errors surfaced by the stream client.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Payload failed parsing or validation. Recoverable; the stream stays open.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] FrameError),

    /// The push connection failed. Terminal for the client that saw it.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl StreamError {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamError::Transport(_))
    }
}
