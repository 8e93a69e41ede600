use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::FolderId,
    protocol::{
        CompileResponse, ServiceReply, UploadResponse, RECOMPILE_FIELD_FILENAME,
        RECOMPILE_FIELD_FOLDER, RECOMPILE_FIELD_SOURCE, UPLOAD_FIELD_FILE,
    },
};
use tracing::debug;
use url::Url;

use crate::{
    config::ClientSettings,
    error::ServiceError,
    types::{DocumentFile, MediaFile, SourceSubmission},
    CompileService,
};

/// [`CompileService`] over HTTP.
pub struct HttpCompileService {
    http: Client,
    base_url: Url,
    upload_endpoint: String,
    compile_media_endpoint: String,
    recompile_endpoint: String,
}

impl HttpCompileService {
    pub fn new(settings: &ClientSettings) -> anyhow::Result<Self> {
        let base_url = Url::parse(&settings.service_url)
            .with_context(|| format!("invalid service url '{}'", settings.service_url))?;
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            base_url,
            upload_endpoint: settings.upload_endpoint.clone(),
            compile_media_endpoint: settings.compile_media_endpoint.clone(),
            recompile_endpoint: settings.recompile_endpoint.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(path)
            .map_err(|err| ServiceError::transport(anyhow!("invalid endpoint '{path}': {err}")))
    }

    fn folder_endpoint(&self, folder: &FolderId) -> Result<Url, ServiceError> {
        let mut url = self.endpoint(&self.compile_media_endpoint)?;
        url.path_segments_mut()
            .map_err(|()| ServiceError::transport(anyhow!("service url cannot carry a path")))?
            .pop_if_empty()
            .push(folder.as_str());
        Ok(url)
    }
}

/// Failure bodies arrive with 4xx/5xx statuses, so the body is decoded before the status is.
async fn decode_reply<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    let body = response.bytes().await?;
    let reply: ServiceReply<T> = serde_json::from_slice(&body)
        .map_err(|err| ServiceError::Malformed(format!("HTTP {status}: {err}")))?;
    Ok(reply.into_result()?)
}

fn media_part(file: MediaFile) -> Result<Part, ServiceError> {
    let part = Part::bytes(file.bytes).file_name(file.filename);
    match file.mime_type {
        Some(mime) => Ok(part.mime_str(&mime)?),
        None => Ok(part),
    }
}

/// One part per file, named after the file.
fn attach_media(mut form: Form, media: Vec<MediaFile>) -> Result<Form, ServiceError> {
    for file in media {
        let name = file.filename.clone();
        form = form.part(name, media_part(file)?);
    }
    Ok(form)
}

#[async_trait]
impl CompileService for HttpCompileService {
    async fn upload_document(&self, document: DocumentFile) -> Result<UploadResponse, ServiceError> {
        let url = self.endpoint(&self.upload_endpoint)?;
        debug!(%url, filename = %document.filename, "POST document");
        let part = Part::bytes(document.contents)
            .file_name(document.filename)
            .mime_str("text/plain")?;
        let form = Form::new().part(UPLOAD_FIELD_FILE, part);

        let response = self.http.post(url).multipart(form).send().await?;
        decode_reply(response).await
    }

    async fn compile_media(
        &self,
        folder: &FolderId,
        media: Vec<MediaFile>,
    ) -> Result<CompileResponse, ServiceError> {
        let url = self.folder_endpoint(folder)?;
        debug!(%url, media = media.len(), "POST media");
        let form = attach_media(Form::new(), media)?;

        let response = self.http.post(url).multipart(form).send().await?;
        decode_reply(response).await
    }

    async fn recompile_source(
        &self,
        submission: SourceSubmission,
    ) -> Result<CompileResponse, ServiceError> {
        let url = self.endpoint(&self.recompile_endpoint)?;
        debug!(%url, filename = %submission.filename, folder = %submission.folder, "POST edited source");
        let form = Form::new()
            .text(RECOMPILE_FIELD_SOURCE, submission.source)
            .text(RECOMPILE_FIELD_FILENAME, submission.filename)
            .text(RECOMPILE_FIELD_FOLDER, submission.folder.0);
        let form = attach_media(form, submission.media)?;

        let response = self.http.post(url).multipart(form).send().await?;
        decode_reply(response).await
    }

    async fn fetch_source(&self, path: &str) -> Result<String, ServiceError> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET source");
        let text = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
