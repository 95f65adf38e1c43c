//! Server errors.

use thiserror::Error;

/// Errors that stop the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address is invalid or cannot be bound.
    #[error("Failed to bind: {0}")]
    BindError(String),

    /// An I/O error while serving.
    #[error("I/O error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let bind_err = ServerError::BindError("Address in use".to_string());
        assert!(bind_err.to_string().contains("Address in use"));

        let io_err = ServerError::IoError("Connection reset".to_string());
        assert!(io_err.to_string().contains("Connection reset"));
    }
}
