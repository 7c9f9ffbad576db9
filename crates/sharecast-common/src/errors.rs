use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// A client frame the relay could not understand. Never fatal to the
/// connection that sent it.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("invalid payload for '{event}': {reason}")]
    InvalidPayload { event: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SharecastError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
