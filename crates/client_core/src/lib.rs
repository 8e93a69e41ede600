use anyhow::anyhow;
use async_trait::async_trait;
use shared::{
    domain::FolderId,
    protocol::{CompileResponse, UploadResponse},
};

pub mod artifact;
pub mod config;
pub mod controller;
pub mod error;
pub mod notifications;
pub mod template;
pub mod transport;
pub mod types;
pub mod view;
pub mod workflow;

pub use controller::WorkflowController;
pub use error::{ServiceError, WorkflowError};
pub use transport::HttpCompileService;
pub use workflow::{transition, Command, Effect, Event, Key, UiMode, Workflow};

use types::{DocumentFile, MediaFile, SourceSubmission};

/// The remote compile service, as seen by the workflow.
#[async_trait]
pub trait CompileService: Send + Sync {
    async fn upload_document(&self, document: DocumentFile) -> Result<UploadResponse, ServiceError>;
    async fn compile_media(
        &self,
        folder: &FolderId,
        media: Vec<MediaFile>,
    ) -> Result<CompileResponse, ServiceError>;
    async fn recompile_source(
        &self,
        submission: SourceSubmission,
    ) -> Result<CompileResponse, ServiceError>;
    async fn fetch_source(&self, path: &str) -> Result<String, ServiceError>;
}

pub struct MissingCompileService;

#[async_trait]
impl CompileService for MissingCompileService {
    async fn upload_document(&self, document: DocumentFile) -> Result<UploadResponse, ServiceError> {
        Err(ServiceError::transport(anyhow!(
            "compile service is unavailable; cannot upload {}",
            document.filename
        )))
    }

    async fn compile_media(
        &self,
        folder: &FolderId,
        _media: Vec<MediaFile>,
    ) -> Result<CompileResponse, ServiceError> {
        Err(ServiceError::transport(anyhow!(
            "compile service is unavailable for folder {folder}"
        )))
    }

    async fn recompile_source(
        &self,
        submission: SourceSubmission,
    ) -> Result<CompileResponse, ServiceError> {
        Err(ServiceError::transport(anyhow!(
            "compile service is unavailable for folder {}",
            submission.folder
        )))
    }

    async fn fetch_source(&self, path: &str) -> Result<String, ServiceError> {
        Err(ServiceError::transport(anyhow!(
            "compile service is unavailable; cannot fetch {path}"
        )))
    }
}
