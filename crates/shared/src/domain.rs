use std::fmt;

use serde::{Deserialize, Serialize};

/// Folder assigned by the compile service to one uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(pub String);

impl FolderId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    #[serde(other)]
    Other,
}

/// One `[kind, filename]` pair as listed by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference(pub MediaKind, pub String);

impl MediaReference {
    pub fn kind(&self) -> MediaKind {
        self.0
    }

    pub fn filename(&self) -> &str {
        &self.1
    }
}
