use std::{fs, path::Path, time::Duration};

use tracing::warn;

use crate::artifact::{ArtifactLayout, DEFAULT_ARTIFACT_NAME, DEFAULT_SOURCE_EXTENSION};

pub const DEFAULT_CONFIG_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub service_url: String,
    pub upload_endpoint: String,
    pub compile_media_endpoint: String,
    pub recompile_endpoint: String,
    pub artifact_name: String,
    pub source_extension: String,
    pub notification_ttl_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:5000/".into(),
            upload_endpoint: "upload".into(),
            compile_media_endpoint: "upload_media".into(),
            recompile_endpoint: "compile_edit".into(),
            artifact_name: DEFAULT_ARTIFACT_NAME.into(),
            source_extension: DEFAULT_SOURCE_EXTENSION.into(),
            notification_ttl_ms: 3000,
            request_timeout_secs: 60,
        }
    }
}

impl ClientSettings {
    pub fn artifact_layout(&self) -> ArtifactLayout {
        ArtifactLayout {
            artifact_name: self.artifact_name.clone(),
            source_extension: self.source_extension.clone(),
        }
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Defaults, then `client.toml` (or `config_path`), then environment overrides.
pub fn load_settings(config_path: Option<&Path>) -> ClientSettings {
    let mut settings = ClientSettings::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<toml::Table>(&raw) {
            Ok(table) => apply_file(&mut settings, &table),
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring malformed client config"),
        }
    }

    apply_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.service_url = normalize_service_url(&settings.service_url);
    settings
}

fn apply_file(settings: &mut ClientSettings, table: &toml::Table) {
    let text = |key: &str| -> Option<String> {
        match table.get(key)? {
            toml::Value::String(v) => Some(v.clone()),
            toml::Value::Integer(v) => Some(v.to_string()),
            other => {
                warn!(key, value = %other, "ignoring non-scalar config value");
                None
            }
        }
    };

    if let Some(v) = text("service_url") {
        settings.service_url = v;
    }
    if let Some(v) = text("upload_endpoint") {
        settings.upload_endpoint = v;
    }
    if let Some(v) = text("compile_media_endpoint") {
        settings.compile_media_endpoint = v;
    }
    if let Some(v) = text("recompile_endpoint") {
        settings.recompile_endpoint = v;
    }
    if let Some(v) = text("artifact_name") {
        settings.artifact_name = v;
    }
    if let Some(v) = text("source_extension") {
        settings.source_extension = v;
    }
    if let Some(v) = text("notification_ttl_ms").and_then(|v| v.parse().ok()) {
        settings.notification_ttl_ms = v;
    }
    if let Some(v) = text("request_timeout_secs").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = v;
    }
}

fn apply_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("IGTEX_SERVICE_URL") {
        settings.service_url = v;
    }
    if let Some(v) = lookup("APP__SERVICE_URL") {
        settings.service_url = v;
    }
    if let Some(v) = lookup("APP__ARTIFACT_NAME") {
        settings.artifact_name = v;
    }
    if let Some(v) = lookup("APP__NOTIFICATION_TTL_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.notification_ttl_ms = parsed;
        }
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
}

/// Endpoints are joined relative to the service URL, so it must end with `/`.
pub fn normalize_service_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return ClientSettings::default().service_url;
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };

    if with_scheme.ends_with('/') {
        with_scheme
    } else {
        format!("{with_scheme}/")
    }
}
