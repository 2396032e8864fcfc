use thiserror::Error;

/// Errors shared by every contentdesk crate
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Invalid field path: {0:?}")]
    InvalidPath(String),

    #[error("Field path {path:?} does not resolve: {reason}")]
    Unresolved { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl From<String> for CommonError {
    fn from(s: String) -> Self {
        CommonError::Generic(s)
    }
}

impl From<&str> for CommonError {
    fn from(s: &str) -> Self {
        CommonError::Generic(s.to_string())
    }
}
