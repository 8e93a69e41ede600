use std::collections::BTreeMap;

use shared::domain::FolderId;

use crate::artifact::Artifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

/// A document source file handed to the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub filename: String,
    pub contents: Vec<u8>,
}

impl DocumentFile {
    pub fn new(filename: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            contents: contents.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Media dropped by the user and not yet submitted, keyed by exact filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaStaging {
    files: BTreeMap<String, MediaFile>,
}

impl MediaStaging {
    /// Inserts or overwrites; returns true when a file of that name was already staged.
    pub fn stage(&mut self, file: MediaFile) -> bool {
        self.files.insert(file.filename.clone(), file).is_some()
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.files.contains_key(filename)
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn files(&self) -> impl Iterator<Item = &MediaFile> {
        self.files.values()
    }

    pub fn to_upload(&self) -> Vec<MediaFile> {
        self.files.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Ordered set of media filenames a document needs before it will compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredMedia(Vec<String>);

impl RequiredMedia {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self(unique)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Requirements with no exactly matching staged filename, in requirement order.
    pub fn missing_from(&self, staging: &MediaStaging) -> Vec<String> {
        self.0
            .iter()
            .filter(|name| !staging.contains(name))
            .cloned()
            .collect()
    }
}

/// Identity of the document currently being compiled or edited.
///
/// Sessions are values: a transition that changes any field builds a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    folder: FolderId,
    required_media: RequiredMedia,
    artifact: Option<Artifact>,
}

impl Session {
    pub fn new(id: SessionId, folder: FolderId, required_media: RequiredMedia) -> Self {
        Self {
            id,
            folder,
            required_media,
            artifact: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn folder(&self) -> &FolderId {
        &self.folder
    }

    pub fn required_media(&self) -> &RequiredMedia {
        &self.required_media
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn basepath(&self) -> Option<&str> {
        self.artifact.as_ref().map(Artifact::basepath)
    }

    pub fn filename(&self) -> Option<&str> {
        self.artifact.as_ref().map(Artifact::filename)
    }

    pub fn with_artifact(&self, artifact: Artifact) -> Self {
        Self {
            artifact: Some(artifact),
            ..self.clone()
        }
    }
}

/// Body of a recompile-from-source request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSubmission {
    pub source: String,
    pub filename: String,
    pub folder: FolderId,
    pub media: Vec<MediaFile>,
}
