mod commands;
mod render;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    config::{load_settings, normalize_service_url},
    notifications::NotificationId,
    types::{DocumentFile, MediaFile},
    Command, Effect, HttpCompileService, Key, WorkflowController,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    commands::{parse_line, Input, HELP},
    render::{describe, render_view},
};

const SCRATCH_FALLBACK_NAME: &str = "document.igtex";

/// Console front-end for the compile workflow.
#[derive(Parser, Debug)]
struct Args {
    /// Client config file (defaults to ./client.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Compile service URL; overrides the config file and environment.
    #[arg(long)]
    service_url: Option<String>,
    /// Directory the editor buffer is mirrored into for editing with an external editor.
    #[arg(long)]
    scratch_dir: Option<PathBuf>,
}

struct Workbench {
    controller: WorkflowController,
    scratch_dir: PathBuf,
    scratch_file: Option<PathBuf>,
}

impl Workbench {
    /// Returns false once the user asks to quit.
    async fn run(&mut self, input: Input) -> Result<bool> {
        match input {
            Input::Empty => {}
            Input::Help => println!("{HELP}"),
            Input::Quit => return Ok(false),
            Input::Status => {}
            Input::Submit(path) => {
                let document = match path {
                    Some(path) => Some(read_document(&path).await?),
                    None => None,
                };
                self.dispatch(Command::SubmitDocument(document)).await?;
            }
            Input::Media(paths) => {
                for path in paths {
                    let file = read_media(&path).await?;
                    self.dispatch(Command::StageMedia(file)).await?;
                }
            }
            Input::Compile => self.dispatch(Command::Compile).await?,
            Input::Edit => self.dispatch(Command::OpenEditor).await?,
            Input::Save => {
                self.pull_scratch().await?;
                self.dispatch(Command::SaveRefresh).await?;
            }
            Input::RefreshKey => {
                self.pull_scratch().await?;
                self.dispatch(Command::KeyPressed(Key::F5)).await?;
            }
            Input::Build => {
                self.pull_scratch().await?;
                self.dispatch(Command::CompileFromEditor).await?;
            }
            Input::Blank => self.dispatch(Command::CreateBlank).await?,
            Input::TogglePreview => self.dispatch(Command::TogglePreview).await?,
            Input::Dismiss(Some(id)) => {
                if !self.controller.dismiss_notification(NotificationId(id)) {
                    println!("no notification [{id}]");
                }
            }
            Input::Dismiss(None) => {
                let ids: Vec<_> = self
                    .controller
                    .notifications()
                    .active()
                    .iter()
                    .map(|notification| notification.id)
                    .collect();
                for id in ids {
                    self.controller.dismiss_notification(id);
                }
            }
        }

        self.controller.expire_notifications(Instant::now());
        println!(
            "{}",
            render_view(&self.controller.view(), self.controller.notifications().active())
        );
        Ok(true)
    }

    /// Dispatches one command and waits for every request it sets off.
    async fn dispatch(&mut self, command: Command) -> Result<()> {
        let mut effects = self.controller.dispatch(command);
        effects.extend(self.controller.settle().await);

        let mut editor_changed = false;
        for effect in &effects {
            if matches!(effect, Effect::ShowEditor { .. } | Effect::FillEditor { .. }) {
                editor_changed = true;
            }
            if let Some(line) = describe(effect) {
                println!("{line}");
            }
        }
        if editor_changed {
            self.push_scratch().await?;
        }
        if self.controller.workflow().editor().is_none() {
            self.scratch_file = None;
        }
        Ok(())
    }

    /// Mirrors the editor buffer to the scratch file.
    async fn push_scratch(&mut self) -> Result<()> {
        let Some(editor) = self.controller.workflow().editor() else {
            return Ok(());
        };
        if editor.is_loading() {
            return Ok(());
        }
        let name = self
            .controller
            .workflow()
            .session()
            .and_then(|session| session.filename())
            .unwrap_or(SCRATCH_FALLBACK_NAME);
        let path = self.scratch_dir.join(name);

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .with_context(|| format!("failed to create {}", self.scratch_dir.display()))?;
        tokio::fs::write(&path, editor.text())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("editing {}", path.display());
        self.scratch_file = Some(path);
        Ok(())
    }

    /// Feeds external edits of the scratch file back into the editor buffer.
    async fn pull_scratch(&mut self) -> Result<()> {
        let Some(path) = self.scratch_file.clone() else {
            return Ok(());
        };
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "scratch file unreadable; keeping buffer");
                return Ok(());
            }
        };
        let unchanged = self
            .controller
            .workflow()
            .editor()
            .is_some_and(|editor| editor.text() == text);
        if !unchanged {
            debug!(path = %path.display(), "picked up scratch file edits");
            self.controller.dispatch(Command::EditSource(text));
        }
        Ok(())
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .with_context(|| format!("{} has no usable file name", path.display()))
}

async fn read_document(path: &Path) -> Result<DocumentFile> {
    let contents = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(DocumentFile::new(file_name(path)?, contents))
}

async fn read_media(path: &Path) -> Result<MediaFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file = MediaFile::new(file_name(path)?, bytes);
    Ok(match mime_guess::from_path(path).first_raw() {
        Some(mime_type) => file.with_mime_type(mime_type),
        None => file,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref());
    if let Some(service_url) = args.service_url {
        settings.service_url = normalize_service_url(&service_url);
    }
    let service = HttpCompileService::new(&settings)?;
    info!(service_url = %service.base_url(), "workbench ready");

    let mut workbench = Workbench {
        controller: WorkflowController::new(Arc::new(service), &settings),
        scratch_dir: args
            .scratch_dir
            .unwrap_or_else(|| std::env::temp_dir().join("igtex-workbench")),
        scratch_file: None,
    };
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = match parse_line(&line) {
            Ok(input) => input,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match workbench.run(input).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => println!("error: {err:#}"),
        }
    }
    Ok(())
}
