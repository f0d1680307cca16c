use thiserror::Error;

/// Failure modes of a single chat turn. Every variant is terminal for the
/// current turn: the dialog halts and waits for a manual continue.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The chat endpoint answered with a non-success status.
    #[error("chat endpoint returned HTTP {status}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Connection-level or decode failure before or during the stream.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ChatError {
    /// The text shown inline in the message bubble when a turn fails,
    /// replacing the thinking indicator.
    pub fn inline_message(&self, model: &str) -> String {
        match self {
            ChatError::Status { status, .. } => {
                format!("{} response error (status {})", model, status.as_u16())
            }
            ChatError::Transport(err) => format!("error: {}", err),
        }
    }
}
