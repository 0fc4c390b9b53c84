//! Error types for CLI commands

use thiserror::Error;

/// Errors that can occur during command execution
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CommandError {
    /// The tree or one of its backends refused the request
    #[error(transparent)]
    Arbor(#[from] arbor_core::Error),

    /// Command line input that clap cannot check on its own
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Output could not be produced
    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for command operations
pub type Result<T> = std::result::Result<T, CommandError>;

impl CommandError {
    /// Create an `InvalidArgument` error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// The underlying arbor error, if any
    pub fn arbor(&self) -> Option<&arbor_core::Error> {
        match self {
            Self::Arbor(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_arbor_error_is_transparent() {
        let error: CommandError = arbor_core::Error::UnknownEntity("alice".into()).into();
        assert_eq!(error.to_string(), "Unknown entity: alice");
        assert!(error.arbor().unwrap().is_not_found());
    }

    #[test]
    fn test_invalid_argument() {
        let error = CommandError::invalid_argument("capability target missing");
        assert_eq!(
            error.to_string(),
            "Invalid argument: capability target missing"
        );
        assert!(error.arbor().is_none());
    }
}
