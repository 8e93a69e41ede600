use crate::error::WorkflowError;

pub const DEFAULT_ARTIFACT_NAME: &str = "output.html";
pub const DEFAULT_SOURCE_EXTENSION: &str = ".igtex";

/// Where a compiled artifact lives and where its source can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: String,
    basepath: String,
    filename: String,
}

impl Artifact {
    /// Path of the rendered artifact, also the download target.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn basepath(&self) -> &str {
        &self.basepath
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn source_path(&self) -> String {
        format!("{}{}", self.basepath, self.filename)
    }
}

/// Naming conventions the compile service uses for its upload folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub artifact_name: String,
    pub source_extension: String,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            artifact_name: DEFAULT_ARTIFACT_NAME.into(),
            source_extension: DEFAULT_SOURCE_EXTENSION.into(),
        }
    }
}

impl ArtifactLayout {
    /// Splits `<prefix>/<stem>_<stamp>/output.html` into its basepath and source filename.
    pub fn resolve(&self, path: &str) -> Result<Artifact, WorkflowError> {
        let invalid = |reason: &str| WorkflowError::ArtifactPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let basepath = path
            .strip_suffix(self.artifact_name.as_str())
            .ok_or_else(|| invalid("does not name the artifact file"))?;
        if !basepath.ends_with('/') {
            return Err(invalid("artifact is not inside a folder"));
        }

        let folder = basepath
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| invalid("missing folder segment"))?;

        let stem = strip_upload_stamp(folder);
        if stem.is_empty() {
            return Err(invalid("folder has no document name"));
        }

        Ok(Artifact {
            path: path.to_string(),
            basepath: basepath.to_string(),
            filename: format!("{stem}{}", self.source_extension),
        })
    }
}

/// Upload folders are named `<stem>_<digits>`.
fn strip_upload_stamp(folder: &str) -> &str {
    match folder.rsplit_once('_') {
        Some((stem, stamp)) if !stamp.is_empty() && stamp.bytes().all(|b| b.is_ascii_digit()) => {
            stem
        }
        _ => folder,
    }
}
