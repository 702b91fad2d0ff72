use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeftError {
    /// The one fatal condition: an event patched a tool call in a message the
    /// reconciler never created. The transcript can no longer be trusted and the
    /// caller should prompt a full reload.
    #[error("conversation desynchronized: {0}")]
    Desynchronized(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("conversation feed closed: {0}")]
    ChannelClosed(String),
}

pub type Result<T> = std::result::Result<T, WeftError>;
