//! Compile workflow state machine. Network answers come back tagged with the [`Ticket`] they
//! were issued under so late ones can be dropped.

use std::fmt;

use shared::{
    domain::FolderId,
    protocol::{CompileResponse, UploadResponse},
};
use tracing::{debug, info, warn};

use crate::{
    artifact::{Artifact, ArtifactLayout},
    error::{ServiceError, WorkflowError},
    template::{blank_document, BLANK_DOCUMENT_TEMPLATE},
    types::{
        DocumentFile, MediaFile, MediaStaging, RequestId, RequiredMedia, Session, SessionId,
        SourceSubmission,
    },
};

pub const SOURCE_LOADING_PLACEHOLDER: &str = "Loading document…";
pub const SOURCE_LOAD_FAILED_TEXT: &str = "Failed to load document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    Idle,
    AwaitingMedia,
    Compiling,
    Compiled,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Compile,
    SaveRefresh,
    CompileFromEditor,
    CreateBlank,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Upload => "Upload",
            Self::Compile | Self::CompileFromEditor => "Compilation",
            Self::SaveRefresh => "Save",
            Self::CreateBlank => "Blank document creation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    F5,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `None` models a drop or file picker that yielded no file.
    SubmitDocument(Option<DocumentFile>),
    StageMedia(MediaFile),
    Compile,
    OpenEditor,
    EditSource(String),
    SaveRefresh,
    CompileFromEditor,
    CreateBlank,
    TogglePreview,
    KeyPressed(Key),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub request: RequestId,
    pub session: Option<SessionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    UploadDocument {
        ticket: Ticket,
        document: DocumentFile,
    },
    CompileMedia {
        ticket: Ticket,
        folder: FolderId,
        media: Vec<MediaFile>,
    },
    RecompileSource {
        ticket: Ticket,
        submission: SourceSubmission,
    },
    FetchSource {
        ticket: Ticket,
        path: String,
    },
}

impl Request {
    pub fn ticket(&self) -> Ticket {
        match self {
            Self::UploadDocument { ticket, .. }
            | Self::CompileMedia { ticket, .. }
            | Self::RecompileSource { ticket, .. }
            | Self::FetchSource { ticket, .. } => *ticket,
        }
    }
}

#[derive(Debug)]
pub enum Completion {
    Uploaded {
        ticket: Ticket,
        result: Result<UploadResponse, ServiceError>,
    },
    Compiled {
        ticket: Ticket,
        result: Result<CompileResponse, ServiceError>,
    },
    SourceFetched {
        ticket: Ticket,
        result: Result<String, ServiceError>,
    },
}

impl Completion {
    pub fn ticket(&self) -> Ticket {
        match self {
            Self::Uploaded { ticket, .. }
            | Self::Compiled { ticket, .. }
            | Self::SourceFetched { ticket, .. } => *ticket,
        }
    }
}

#[derive(Debug)]
pub enum Event {
    Command(Command),
    Completion(Completion),
}

impl From<Command> for Event {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

impl From<Completion> for Event {
    fn from(completion: Completion) -> Self {
        Self::Completion(completion)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Request(Request),
    ShowMediaZone { required: Vec<String> },
    MediaReady { staged: Vec<String> },
    ShowPreview { path: String },
    RevealPreview,
    CollapsePreview,
    ShowArtifactActions { download: String },
    ShowEditor { text: String, loading: bool },
    FillEditor { text: String },
    SuppressKeyDefault(Key),
    Notify { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceState {
    Loading(RequestId),
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    text: String,
    source: SourceState,
    edited: bool,
}

impl Editor {
    fn loading(request: RequestId) -> Self {
        Self {
            text: String::new(),
            source: SourceState::Loading(request),
            edited: false,
        }
    }

    fn loaded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: SourceState::Loaded,
            edited: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.source, SourceState::Loading(_))
    }

    pub fn placeholder(&self) -> Option<&'static str> {
        (self.is_loading() && self.text.is_empty()).then_some(SOURCE_LOADING_PLACEHOLDER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub path: String,
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitingMedia {
        session: Session,
        staging: MediaStaging,
    },
    Compiled {
        session: Session,
    },
    Editing {
        session: Session,
        editor: Editor,
        staging: MediaStaging,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Job {
    Upload,
    Compile,
    SaveRefresh,
    CompileFromEditor,
    BlankUpload,
    /// Holds the uploaded blank session until its compile succeeds.
    BlankCompile { session: Session },
}

impl Job {
    fn operation(&self) -> Operation {
        match self {
            Self::Upload => Operation::Upload,
            Self::Compile => Operation::Compile,
            Self::SaveRefresh => Operation::SaveRefresh,
            Self::CompileFromEditor => Operation::CompileFromEditor,
            Self::BlankUpload | Self::BlankCompile { .. } => Operation::CreateBlank,
        }
    }

    fn shows_compiling(&self) -> bool {
        matches!(
            self,
            Self::Compile | Self::CompileFromEditor | Self::BlankCompile { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InFlight {
    ticket: Ticket,
    job: Job,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    phase: Phase,
    in_flight: Option<InFlight>,
    preview: Option<Preview>,
    layout: ArtifactLayout,
    next_request: u64,
    next_session: u64,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new(ArtifactLayout::default())
    }
}

pub fn transition(mut workflow: Workflow, event: Event) -> (Workflow, Vec<Effect>) {
    let mut effects = Vec::new();
    match event {
        Event::Command(command) => workflow.on_command(command, &mut effects),
        Event::Completion(completion) => workflow.on_completion(completion, &mut effects),
    }
    (workflow, effects)
}

pub fn failure_notice(operation: Operation, err: &ServiceError) -> String {
    match err.service_message() {
        Some(message) => message.to_string(),
        None => format!("{operation} failed"),
    }
}

impl Workflow {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self {
            phase: Phase::Idle,
            in_flight: None,
            preview: None,
            layout,
            next_request: 0,
            next_session: 0,
        }
    }

    pub fn apply(self, event: impl Into<Event>) -> (Self, Vec<Effect>) {
        transition(self, event.into())
    }

    pub fn mode(&self) -> UiMode {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.job.shows_compiling())
        {
            return UiMode::Compiling;
        }
        self.settled_mode()
    }

    pub fn settled_mode(&self) -> UiMode {
        match &self.phase {
            Phase::Idle => UiMode::Idle,
            Phase::AwaitingMedia { .. } => UiMode::AwaitingMedia,
            Phase::Compiled { .. } => UiMode::Compiled,
            Phase::Editing { .. } => UiMode::Editing,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::Idle => None,
            Phase::AwaitingMedia { session, .. }
            | Phase::Compiled { session }
            | Phase::Editing { session, .. } => Some(session),
        }
    }

    pub fn staging(&self) -> Option<&MediaStaging> {
        match &self.phase {
            Phase::AwaitingMedia { staging, .. } | Phase::Editing { staging, .. } => Some(staging),
            Phase::Idle | Phase::Compiled { .. } => None,
        }
    }

    pub fn editor(&self) -> Option<&Editor> {
        match &self.phase {
            Phase::Editing { editor, .. } => Some(editor),
            _ => None,
        }
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn in_flight(&self) -> Option<Operation> {
        self.in_flight
            .as_ref()
            .map(|in_flight| in_flight.job.operation())
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn intercepts_refresh_key(&self) -> bool {
        matches!(self.phase, Phase::Editing { .. })
    }

    fn issue(&mut self, session: Option<SessionId>) -> Ticket {
        self.next_request += 1;
        Ticket {
            request: RequestId(self.next_request),
            session,
        }
    }

    fn next_session_id(&mut self) -> SessionId {
        self.next_session += 1;
        SessionId(self.next_session)
    }

    fn on_command(&mut self, command: Command, effects: &mut Vec<Effect>) {
        match command {
            Command::SubmitDocument(None) => debug!("submit without a document; ignoring"),
            Command::SubmitDocument(Some(document)) => {
                self.submit(document, Job::Upload, effects)
            }
            Command::CreateBlank => self.submit(blank_document(), Job::BlankUpload, effects),
            Command::StageMedia(file) => self.stage_media(file, effects),
            Command::Compile => self.compile(effects),
            Command::OpenEditor => self.open_editor(effects),
            Command::EditSource(text) => match &mut self.phase {
                Phase::Editing { editor, .. } => {
                    editor.text = text;
                    editor.edited = true;
                }
                _ => debug!("no editor open; ignoring source edit"),
            },
            Command::SaveRefresh => self.recompile(Job::SaveRefresh, effects),
            Command::CompileFromEditor => self.recompile(Job::CompileFromEditor, effects),
            Command::TogglePreview => match self.preview.as_mut() {
                Some(preview) => {
                    preview.open = !preview.open;
                    effects.push(if preview.open {
                        Effect::RevealPreview
                    } else {
                        Effect::CollapsePreview
                    });
                }
                None => debug!("no preview to toggle"),
            },
            Command::KeyPressed(Key::F5) if self.intercepts_refresh_key() => {
                effects.push(Effect::SuppressKeyDefault(Key::F5));
                self.recompile(Job::SaveRefresh, effects);
            }
            Command::KeyPressed(_) => {}
        }
    }

    /// Uploads always take the request slot; whatever was outstanding becomes stale.
    fn submit(&mut self, document: DocumentFile, job: Job, effects: &mut Vec<Effect>) {
        if let Some(previous) = &self.in_flight {
            debug!(
                request = previous.ticket.request.0,
                operation = %previous.job.operation(),
                "superseding in-flight request"
            );
        }
        let ticket = self.issue(None);
        info!(
            request = ticket.request.0,
            filename = %document.filename,
            operation = %job.operation(),
            "uploading document"
        );
        self.in_flight = Some(InFlight { ticket, job });
        effects.push(Effect::Request(Request::UploadDocument { ticket, document }));
    }

    fn stage_media(&mut self, file: MediaFile, effects: &mut Vec<Effect>) {
        let staging = match &mut self.phase {
            Phase::AwaitingMedia { staging, .. } | Phase::Editing { staging, .. } => staging,
            Phase::Idle | Phase::Compiled { .. } => {
                debug!(filename = %file.filename, "no media drop zone; ignoring file");
                return;
            }
        };
        let filename = file.filename.clone();
        if staging.stage(file) {
            debug!(%filename, "replaced staged media file");
        }
        effects.push(Effect::MediaReady {
            staged: staging.filenames().map(str::to_owned).collect(),
        });
    }

    fn slot_busy(&self, trigger: Operation) -> bool {
        match &self.in_flight {
            Some(in_flight) => {
                debug!(
                    %trigger,
                    outstanding = %in_flight.job.operation(),
                    "request already in flight; ignoring trigger"
                );
                true
            }
            None => false,
        }
    }

    fn compile(&mut self, effects: &mut Vec<Effect>) {
        let Phase::AwaitingMedia { session, staging } = &self.phase else {
            debug!(mode = ?self.mode(), "compile is only offered while awaiting media");
            return;
        };
        if self.slot_busy(Operation::Compile) {
            return;
        }

        let missing = session.required_media().missing_from(staging);
        if !missing.is_empty() {
            reject_missing(missing, effects);
            return;
        }

        let session_id = session.id();
        let folder = session.folder().clone();
        let media = staging.to_upload();
        let ticket = self.issue(Some(session_id));
        info!(request = ticket.request.0, %folder, media = media.len(), "compiling");
        self.in_flight = Some(InFlight {
            ticket,
            job: Job::Compile,
        });
        effects.push(Effect::Request(Request::CompileMedia {
            ticket,
            folder,
            media,
        }));
    }

    fn open_editor(&mut self, effects: &mut Vec<Effect>) {
        let Phase::Compiled { session } = &self.phase else {
            debug!(mode = ?self.mode(), "editor opens from a compiled document only");
            return;
        };
        let Some(artifact) = session.artifact() else {
            warn!(folder = %session.folder(), "compiled session has no artifact");
            return;
        };

        let path = artifact.source_path();
        let session = session.clone();
        let ticket = self.issue(Some(session.id()));
        debug!(request = ticket.request.0, %path, "fetching document source");
        self.phase = Phase::Editing {
            session,
            editor: Editor::loading(ticket.request),
            staging: MediaStaging::default(),
        };
        self.collapse_preview(effects);
        effects.push(Effect::ShowEditor {
            text: String::new(),
            loading: true,
        });
        effects.push(Effect::Request(Request::FetchSource { ticket, path }));
    }

    fn recompile(&mut self, job: Job, effects: &mut Vec<Effect>) {
        let operation = job.operation();
        let Phase::Editing {
            session,
            editor,
            staging,
        } = &self.phase
        else {
            debug!(%operation, "no editor open; ignoring");
            return;
        };
        if self.slot_busy(operation) {
            return;
        }
        if editor.is_loading() && !editor.edited {
            debug!(%operation, "document source still loading; ignoring");
            return;
        }

        let missing = session.required_media().missing_from(staging);
        if !missing.is_empty() {
            reject_missing(missing, effects);
            return;
        }
        let Some(filename) = session.filename() else {
            warn!(folder = %session.folder(), "editing session has no source filename");
            return;
        };

        let submission = SourceSubmission {
            source: editor.text.clone(),
            filename: filename.to_string(),
            folder: session.folder().clone(),
            media: staging.to_upload(),
        };
        let session_id = session.id();
        let ticket = self.issue(Some(session_id));
        info!(
            request = ticket.request.0,
            %operation,
            folder = %submission.folder,
            "recompiling edited source"
        );
        self.in_flight = Some(InFlight { ticket, job });
        effects.push(Effect::Request(Request::RecompileSource { ticket, submission }));
    }

    fn on_completion(&mut self, completion: Completion, effects: &mut Vec<Effect>) {
        match completion {
            Completion::SourceFetched { ticket, result } => {
                self.source_fetched(ticket, result, effects)
            }
            Completion::Uploaded { ticket, result } => {
                let Some(job) = self.claim(ticket) else {
                    return;
                };
                match job {
                    Job::Upload => self.upload_finished(result, effects),
                    Job::BlankUpload => self.blank_upload_finished(result, effects),
                    other => mismatched(&other, ticket),
                }
            }
            Completion::Compiled { ticket, result } => {
                let Some(job) = self.claim(ticket) else {
                    return;
                };
                match job {
                    Job::Compile => self.compile_finished(Operation::Compile, result, effects),
                    Job::CompileFromEditor => {
                        self.compile_finished(Operation::CompileFromEditor, result, effects)
                    }
                    Job::SaveRefresh => self.save_finished(result, effects),
                    Job::BlankCompile { session } => {
                        self.blank_compile_finished(session, result, effects)
                    }
                    other => mismatched(&other, ticket),
                }
            }
        }
    }

    /// Releases the request slot if `ticket` still owns it and its session is still live.
    fn claim(&mut self, ticket: Ticket) -> Option<Job> {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if in_flight.ticket == ticket => in_flight,
            other => {
                self.in_flight = other;
                debug!(request = ticket.request.0, "discarding response to superseded request");
                return None;
            }
        };

        let expected_session = match &in_flight.job {
            Job::Upload | Job::BlankUpload => None,
            Job::BlankCompile { session } => Some(Some(session.id())),
            Job::Compile | Job::SaveRefresh | Job::CompileFromEditor => {
                Some(self.session().map(Session::id))
            }
        };
        if let Some(expected) = expected_session {
            if expected != ticket.session {
                debug!(
                    request = ticket.request.0,
                    "discarding response for a session that is no longer live"
                );
                return None;
            }
        }
        Some(in_flight.job)
    }

    fn upload_finished(
        &mut self,
        result: Result<UploadResponse, ServiceError>,
        effects: &mut Vec<Effect>,
    ) {
        let upload = match result {
            Ok(upload) => upload,
            Err(err) => return fail(Operation::Upload, &err, effects),
        };

        let session = self.session_from(upload);
        let required = session.required_media().names().to_vec();
        info!(folder = %session.folder(), required = ?required, "document uploaded");
        // Session and staging are replaced together; nothing from the previous document survives.
        self.phase = Phase::AwaitingMedia {
            session,
            staging: MediaStaging::default(),
        };
        effects.push(Effect::ShowMediaZone { required });
    }

    fn blank_upload_finished(
        &mut self,
        result: Result<UploadResponse, ServiceError>,
        effects: &mut Vec<Effect>,
    ) {
        let upload = match result {
            Ok(upload) => upload,
            Err(err) => return fail(Operation::CreateBlank, &err, effects),
        };

        let session = self.session_from(upload);
        if !session.required_media().is_empty() {
            debug!(
                required = ?session.required_media().names(),
                "blank document lists media; compiling without it"
            );
        }
        let folder = session.folder().clone();
        let ticket = self.issue(Some(session.id()));
        info!(request = ticket.request.0, %folder, "compiling blank document");
        self.in_flight = Some(InFlight {
            ticket,
            job: Job::BlankCompile { session },
        });
        effects.push(Effect::Request(Request::CompileMedia {
            ticket,
            folder,
            media: Vec::new(),
        }));
    }

    fn compile_finished(
        &mut self,
        operation: Operation,
        result: Result<CompileResponse, ServiceError>,
        effects: &mut Vec<Effect>,
    ) {
        let Some(artifact) = self.resolve_artifact(operation, result, effects) else {
            return;
        };
        let Some(session) = self.session() else {
            warn!(%operation, "compile finished without a live session");
            return;
        };

        let session = session.with_artifact(artifact.clone());
        info!(path = artifact.path(), filename = artifact.filename(), "document compiled");
        self.phase = Phase::Compiled { session };
        self.show_preview(artifact.path(), effects);
        effects.push(Effect::ShowArtifactActions {
            download: artifact.path().to_string(),
        });
    }

    fn save_finished(
        &mut self,
        result: Result<CompileResponse, ServiceError>,
        effects: &mut Vec<Effect>,
    ) {
        let Some(artifact) = self.resolve_artifact(Operation::SaveRefresh, result, effects) else {
            return;
        };
        info!(path = artifact.path(), "preview refreshed");
        self.show_preview(artifact.path(), effects);
        effects.push(Effect::RevealPreview);
    }

    fn blank_compile_finished(
        &mut self,
        session: Session,
        result: Result<CompileResponse, ServiceError>,
        effects: &mut Vec<Effect>,
    ) {
        let Some(artifact) = self.resolve_artifact(Operation::CreateBlank, result, effects) else {
            return;
        };

        info!(path = artifact.path(), "blank document ready for editing");
        self.phase = Phase::Editing {
            session: session.with_artifact(artifact.clone()),
            editor: Editor::loaded(BLANK_DOCUMENT_TEMPLATE),
            staging: MediaStaging::default(),
        };
        self.show_preview(artifact.path(), effects);
        self.collapse_preview(effects);
        effects.push(Effect::ShowEditor {
            text: BLANK_DOCUMENT_TEMPLATE.to_string(),
            loading: false,
        });
    }

    fn source_fetched(
        &mut self,
        ticket: Ticket,
        result: Result<String, ServiceError>,
        effects: &mut Vec<Effect>,
    ) {
        let Phase::Editing {
            session, editor, ..
        } = &mut self.phase
        else {
            debug!(request = ticket.request.0, "editor closed; discarding fetched source");
            return;
        };
        if editor.source != SourceState::Loading(ticket.request)
            || ticket.session != Some(session.id())
        {
            debug!(request = ticket.request.0, "discarding stale source fetch");
            return;
        }

        match result {
            Ok(text) => {
                editor.source = SourceState::Loaded;
                if !editor.edited {
                    editor.text = text;
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to load document source");
                editor.source = SourceState::Failed;
                if !editor.edited {
                    editor.text = SOURCE_LOAD_FAILED_TEXT.to_string();
                }
            }
        }
        effects.push(Effect::FillEditor {
            text: editor.text.clone(),
        });
    }

    fn session_from(&mut self, upload: UploadResponse) -> Session {
        let required = RequiredMedia::from_names(upload.media_filenames());
        Session::new(self.next_session_id(), upload.folder, required)
    }

    fn resolve_artifact(
        &self,
        operation: Operation,
        result: Result<CompileResponse, ServiceError>,
        effects: &mut Vec<Effect>,
    ) -> Option<Artifact> {
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                fail(operation, &err, effects);
                return None;
            }
        };
        match self.layout.resolve(&response.path) {
            Ok(artifact) => Some(artifact),
            Err(err) => {
                fail(operation, &ServiceError::Malformed(err.to_string()), effects);
                None
            }
        }
    }

    fn show_preview(&mut self, path: &str, effects: &mut Vec<Effect>) {
        self.preview = Some(Preview {
            path: path.to_string(),
            open: true,
        });
        effects.push(Effect::ShowPreview {
            path: path.to_string(),
        });
    }

    fn collapse_preview(&mut self, effects: &mut Vec<Effect>) {
        if let Some(preview) = self.preview.as_mut().filter(|preview| preview.open) {
            preview.open = false;
            effects.push(Effect::CollapsePreview);
        }
    }
}

fn reject_missing(missing: Vec<String>, effects: &mut Vec<Effect>) {
    let err = WorkflowError::MissingMedia { missing };
    info!(error = %err, "compile blocked locally");
    effects.push(Effect::Notify {
        message: err.to_string(),
    });
}

fn fail(operation: Operation, err: &ServiceError, effects: &mut Vec<Effect>) {
    warn!(%operation, error = %err, "operation failed");
    if let ServiceError::Rejected(failure) = err {
        if failure.is_missing_media() {
            warn!(missing = ?failure.missing, "service reports missing media");
        }
    }
    effects.push(Effect::Notify {
        message: failure_notice(operation, err),
    });
}

fn mismatched(job: &Job, ticket: Ticket) {
    warn!(
        request = ticket.request.0,
        operation = %job.operation(),
        "completion kind does not match the in-flight request"
    );
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
