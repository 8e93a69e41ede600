use serde::{Deserialize, Serialize};

use crate::{
    domain::{FolderId, MediaReference},
    error::ServiceFailure,
};

/// Multipart field carrying the document on upload.
pub const UPLOAD_FIELD_FILE: &str = "file";
pub const RECOMPILE_FIELD_SOURCE: &str = "source";
pub const RECOMPILE_FIELD_FILENAME: &str = "filename";
pub const RECOMPILE_FIELD_FOLDER: &str = "folder";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub folder: FolderId,
    #[serde(default)]
    pub media: Vec<MediaReference>,
}

impl UploadResponse {
    /// Filenames the document references, in listing order (duplicates kept).
    pub fn media_filenames(&self) -> impl Iterator<Item = &str> {
        self.media.iter().map(MediaReference::filename)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResponse {
    #[serde(default)]
    pub success: bool,
    pub path: String,
}

impl CompileResponse {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            success: true,
            path: path.into(),
        }
    }
}

/// Every JSON answer from the service is either a failure body or the expected payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceReply<T> {
    Failure(ServiceFailure),
    Success(T),
}

impl<T> ServiceReply<T> {
    pub fn into_result(self) -> Result<T, ServiceFailure> {
        match self {
            Self::Failure(failure) => Err(failure),
            Self::Success(value) => Ok(value),
        }
    }
}
