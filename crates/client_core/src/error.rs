use shared::error::ServiceFailure;
use thiserror::Error;

/// Failure of one call against the compile service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service answered with an `error` body; its message is shown verbatim.
    #[error(transparent)]
    Rejected(#[from] ServiceFailure),
    #[error("transport failure: {0:#}")]
    Transport(anyhow::Error),
    #[error("malformed service response: {0}")]
    Malformed(String),
}

impl ServiceError {
    pub fn transport(err: impl Into<anyhow::Error>) -> Self {
        Self::Transport(err.into())
    }

    /// Message supplied by the service itself, if any.
    pub fn service_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(failure) => Some(&failure.error),
            Self::Transport(_) | Self::Malformed(_) => None,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.into())
        }
    }
}

/// Errors detected locally, before anything reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("Missing media files: {}", .missing.join(", "))]
    MissingMedia { missing: Vec<String> },
    #[error("cannot resolve artifact path {path:?}: {reason}")]
    ArtifactPath { path: String, reason: String },
}
