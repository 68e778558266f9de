use thiserror::Error;

/// Core error types for backoffice operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid enum definition: {message}")]
    InvalidEnum { message: String },
}

impl CoreError {
    /// Create a new Io error
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a new InvalidEnum error
    pub fn invalid_enum(message: impl Into<String>) -> Self {
        Self::InvalidEnum {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
