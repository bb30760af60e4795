use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MpnError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Catalog Error: {0}")]
    Catalog(String),

    #[error("Resolution Error: {0}")]
    Resolve(String),

    #[error("Failed to copy dependency '{}': {source}", path.display())]
    Copy {
        path: PathBuf,
        source: Arc<std::io::Error>,
    },

    #[error("Failed to write output '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: Arc<std::io::Error>,
    },

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Worker Error: {0}")]
    Worker(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl MpnError {
    pub fn copy(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        MpnError::Copy {
            path: path.into(),
            source: Arc::new(err),
        }
    }

    pub fn write(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        MpnError::Write {
            path: path.into(),
            source: Arc::new(err),
        }
    }
}

impl From<std::io::Error> for MpnError {
    fn from(err: std::io::Error) -> Self {
        MpnError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for MpnError {
    fn from(err: serde_json::Error) -> Self {
        MpnError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, MpnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_error_names_the_path() {
        let err = MpnError::copy(
            "/tmp/node_modules/lodash/get.js",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("/tmp/node_modules/lodash/get.js"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn io_errors_convert_and_clone() {
        let err: MpnError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        let cloned = err.clone();
        assert!(matches!(cloned, MpnError::Io(_)));
    }
}
