use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure body returned by the compile service (`{ "error": ..., "missing": [...] }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{error}")]
pub struct ServiceFailure {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

impl ServiceFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            missing: Vec::new(),
        }
    }

    pub fn is_missing_media(&self) -> bool {
        !self.missing.is_empty()
    }
}
