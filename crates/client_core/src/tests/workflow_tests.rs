use super::*;
use anyhow::anyhow;
use shared::{
    domain::{MediaKind, MediaReference},
    error::ServiceFailure,
};

use crate::template::BLANK_DOCUMENT_NAME;

const ARTIFACT_PATH: &str = "/static/uploads/talk_1712345678901234/output.html";

fn upload_response(folder: &str, media: &[&str]) -> UploadResponse {
    UploadResponse {
        folder: FolderId::new(folder),
        media: media
            .iter()
            .map(|name| MediaReference(MediaKind::Image, name.to_string()))
            .collect(),
    }
}

fn document() -> DocumentFile {
    DocumentFile::new("talk.igtex", b"\\image{logo.png}".to_vec())
}

fn media(name: &str) -> MediaFile {
    MediaFile::new(name, name.as_bytes().to_vec())
}

fn requests(effects: &[Effect]) -> Vec<&Request> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Request(request) => Some(request),
            _ => None,
        })
        .collect()
}

fn notifications(effects: &[Effect]) -> Vec<&str> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Notify { message } => Some(message.as_str()),
            _ => None,
        })
        .collect()
}

fn only_request(effects: &[Effect]) -> Request {
    let found = requests(effects);
    assert_eq!(found.len(), 1, "expected exactly one request: {effects:?}");
    found[0].clone()
}

/// Submits a document and answers the upload with `media` as the required list.
fn uploaded(media: &[&str]) -> Workflow {
    let (workflow, effects) = Workflow::default().apply(Command::SubmitDocument(Some(document())));
    let ticket = only_request(&effects).ticket();
    let (workflow, effects) = workflow.apply(Completion::Uploaded {
        ticket,
        result: Ok(upload_response("talk_1712345678901234", media)),
    });
    assert!(notifications(&effects).is_empty());
    workflow
}

fn compiled() -> Workflow {
    let (workflow, effects) = uploaded(&[]).apply(Command::Compile);
    let ticket = only_request(&effects).ticket();
    let (workflow, _) = workflow.apply(Completion::Compiled {
        ticket,
        result: Ok(CompileResponse::new(ARTIFACT_PATH)),
    });
    assert_eq!(workflow.mode(), UiMode::Compiled);
    workflow
}

fn editing(source: &str) -> Workflow {
    let (workflow, effects) = compiled().apply(Command::OpenEditor);
    let ticket = only_request(&effects).ticket();
    let (workflow, _) = workflow.apply(Completion::SourceFetched {
        ticket,
        result: Ok(source.to_string()),
    });
    workflow
}

#[test]
fn starts_idle_without_session() {
    let workflow = Workflow::default();
    assert_eq!(workflow.mode(), UiMode::Idle);
    assert!(workflow.session().is_none());
    assert!(workflow.staging().is_none());
}

#[test]
fn submit_without_file_is_a_no_op() {
    let (workflow, effects) = Workflow::default().apply(Command::SubmitDocument(None));
    assert!(effects.is_empty());
    assert_eq!(workflow, Workflow::default());
}

#[test]
fn upload_success_creates_session_and_awaits_media() {
    let workflow = uploaded(&["logo.png", "logo.png", "intro.mp4"]);

    assert_eq!(workflow.mode(), UiMode::AwaitingMedia);
    let session = workflow.session().expect("session");
    assert_eq!(session.folder().as_str(), "talk_1712345678901234");
    assert_eq!(
        session.required_media().names(),
        ["logo.png".to_string(), "intro.mp4".to_string()]
    );
    assert!(workflow.staging().expect("staging").is_empty());
}

#[test]
fn upload_failure_keeps_previous_state_and_notifies() {
    let before = uploaded(&["logo.png"]);
    let (workflow, effects) = before
        .clone()
        .apply(Command::SubmitDocument(Some(document())));
    let ticket = only_request(&effects).ticket();
    let (workflow, effects) = workflow.apply(Completion::Uploaded {
        ticket,
        result: Err(ServiceError::transport(anyhow!("connection refused"))),
    });

    assert_eq!(notifications(&effects), vec!["Upload failed"]);
    assert_eq!(workflow.mode(), before.mode());
    assert_eq!(workflow.session(), before.session());
    assert_eq!(workflow.staging(), before.staging());
}

#[test]
fn service_rejection_is_shown_verbatim() {
    let (workflow, effects) = Workflow::default().apply(Command::SubmitDocument(Some(document())));
    let ticket = only_request(&effects).ticket();
    let (workflow, effects) = workflow.apply(Completion::Uploaded {
        ticket,
        result: Err(ServiceFailure::new("Invalid .igtex file").into()),
    });

    assert_eq!(notifications(&effects), vec!["Invalid .igtex file"]);
    assert_eq!(workflow.mode(), UiMode::Idle);
}

#[test]
fn empty_required_media_compiles_without_staged_files() {
    let (workflow, effects) = uploaded(&[]).apply(Command::Compile);

    assert!(notifications(&effects).is_empty());
    match only_request(&effects) {
        Request::CompileMedia { folder, media, .. } => {
            assert_eq!(folder.as_str(), "talk_1712345678901234");
            assert!(media.is_empty());
        }
        other => panic!("unexpected request: {other:?}"),
    }
    assert_eq!(workflow.mode(), UiMode::Compiling);
}

#[test]
fn compile_rejects_locally_listing_exactly_the_missing_media() {
    let workflow = uploaded(&["a.png", "b.png"]);
    let (workflow, _) = workflow.apply(Command::StageMedia(media("a.png")));
    let before = workflow.clone();
    let (workflow, effects) = workflow.apply(Command::Compile);

    assert!(requests(&effects).is_empty());
    assert_eq!(notifications(&effects), vec!["Missing media files: b.png"]);
    assert_eq!(workflow, before);
}

#[test]
fn staging_tolerates_unlisted_media_and_reports_ready_files() {
    let workflow = uploaded(&["logo.png"]);
    let (workflow, effects) = workflow.apply(Command::StageMedia(media("extra.png")));
    assert_eq!(
        effects,
        vec![Effect::MediaReady {
            staged: vec!["extra.png".to_string()]
        }]
    );
    let (workflow, _) = workflow.apply(Command::StageMedia(media("logo.png")));
    let (_, effects) = workflow.apply(Command::Compile);

    match only_request(&effects) {
        Request::CompileMedia { media, .. } => {
            let names: Vec<_> = media.iter().map(|m| m.filename.as_str()).collect();
            assert_eq!(names, vec!["extra.png", "logo.png"]);
        }
        other => panic!("unexpected request: {other:?}"),
    }
}

#[test]
fn staging_is_ignored_outside_a_drop_zone() {
    let (workflow, effects) = Workflow::default().apply(Command::StageMedia(media("a.png")));
    assert!(effects.is_empty());
    assert!(workflow.staging().is_none());
}

#[test]
fn compile_success_derives_artifact_and_shows_actions() {
    let workflow = uploaded(&["logo.png"]);
    let (workflow, _) = workflow.apply(Command::StageMedia(media("logo.png")));
    let (workflow, effects) = workflow.apply(Command::Compile);
    let ticket = only_request(&effects).ticket();
    let (workflow, effects) = workflow.apply(Completion::Compiled {
        ticket,
        result: Ok(CompileResponse::new(ARTIFACT_PATH)),
    });

    assert_eq!(workflow.mode(), UiMode::Compiled);
    assert!(effects.contains(&Effect::ShowPreview {
        path: ARTIFACT_PATH.to_string()
    }));
    assert!(effects.contains(&Effect::ShowArtifactActions {
        download: ARTIFACT_PATH.to_string()
    }));
    let session = workflow.session().expect("session");
    assert_eq!(
        session.basepath(),
        Some("/static/uploads/talk_1712345678901234/")
    );
    assert_eq!(session.filename(), Some("talk.igtex"));
    assert_eq!(workflow.preview().map(|p| p.path.as_str()), Some(ARTIFACT_PATH));
}

#[test]
fn compile_failure_restores_awaiting_media_unchanged() {
    let workflow = uploaded(&["logo.png"]);
    let (before, _) = workflow.apply(Command::StageMedia(media("logo.png")));
    let (workflow, effects) = before.clone().apply(Command::Compile);
    let ticket = only_request(&effects).ticket();
    let (workflow, effects) = workflow.apply(Completion::Compiled {
        ticket,
        result: Err(ServiceFailure::new("line 3: unknown command \\imgae").into()),
    });

    assert_eq!(
        notifications(&effects),
        vec!["line 3: unknown command \\imgae"]
    );
    assert_eq!(workflow.mode(), UiMode::AwaitingMedia);
    assert_eq!(workflow.session(), before.session());
    assert_eq!(workflow.staging(), before.staging());
}

#[test]
fn unresolvable_artifact_path_is_a_generic_compile_failure() {
    let (workflow, effects) = uploaded(&[]).apply(Command::Compile);
    let ticket = only_request(&effects).ticket();
    let (workflow, effects) = workflow.apply(Completion::Compiled {
        ticket,
        result: Ok(CompileResponse::new("/static/uploads/talk_1/report.pdf")),
    });

    assert_eq!(notifications(&effects), vec!["Compilation failed"]);
    assert_eq!(workflow.mode(), UiMode::AwaitingMedia);
}

#[test]
fn second_compile_trigger_while_in_flight_is_ignored() {
    let (workflow, effects) = uploaded(&[]).apply(Command::Compile);
    assert_eq!(requests(&effects).len(), 1);
    let (workflow, effects) = workflow.apply(Command::Compile);

    assert!(effects.is_empty());
    assert_eq!(workflow.mode(), UiMode::Compiling);
}

#[test]
fn stale_compile_response_does_not_touch_newer_session() {
    let (workflow, effects) = uploaded(&[]).apply(Command::Compile);
    let stale_ticket = only_request(&effects).ticket();

    let (workflow, effects) = workflow.apply(Command::SubmitDocument(Some(document())));
    let upload_ticket = only_request(&effects).ticket();
    let (workflow, _) = workflow.apply(Completion::Uploaded {
        ticket: upload_ticket,
        result: Ok(upload_response("other_42", &["x.png"])),
    });
    let newer = workflow.clone();

    let (workflow, effects) = workflow.apply(Completion::Compiled {
        ticket: stale_ticket,
        result: Ok(CompileResponse::new(ARTIFACT_PATH)),
    });

    assert!(effects.is_empty());
    assert_eq!(workflow, newer);
    assert_eq!(workflow.mode(), UiMode::AwaitingMedia);
    assert_eq!(
        workflow.session().map(|s| s.folder().as_str()),
        Some("other_42")
    );
}

#[test]
fn resubmitting_discards_session_staging_and_editor() {
    let workflow = editing("\\image{logo.png}");
    let (workflow, _) = workflow.apply(Command::StageMedia(media("logo.png")));
    let (workflow, effects) = workflow.apply(Command::SubmitDocument(Some(document())));
    let ticket = only_request(&effects).ticket();
    let (workflow, _) = workflow.apply(Completion::Uploaded {
        ticket,
        result: Ok(upload_response("fresh_7", &["logo.png"])),
    });

    assert_eq!(workflow.mode(), UiMode::AwaitingMedia);
    assert!(workflow.editor().is_none());
    assert!(workflow.staging().expect("staging").is_empty());
    assert!(!workflow.intercepts_refresh_key());
}

#[test]
fn opening_editor_fetches_source_with_placeholder() {
    let (workflow, effects) = compiled().apply(Command::OpenEditor);

    assert_eq!(workflow.mode(), UiMode::Editing);
    match only_request(&effects) {
        Request::FetchSource { path, .. } => {
            assert_eq!(path, "/static/uploads/talk_1712345678901234/talk.igtex")
        }
        other => panic!("unexpected request: {other:?}"),
    }
    assert!(effects.contains(&Effect::CollapsePreview));
    let editor = workflow.editor().expect("editor");
    assert!(editor.is_loading());
    assert_eq!(editor.placeholder(), Some(SOURCE_LOADING_PLACEHOLDER));
    assert!(workflow.staging().expect("fresh staging").is_empty());
}

#[test]
fn failed_source_fetch_fills_sentinel_text() {
    let (workflow, effects) = compiled().apply(Command::OpenEditor);
    let ticket = only_request(&effects).ticket();
    let (workflow, effects) = workflow.apply(Completion::SourceFetched {
        ticket,
        result: Err(ServiceError::transport(anyhow!("404"))),
    });

    assert_eq!(
        workflow.editor().map(Editor::text),
        Some(SOURCE_LOAD_FAILED_TEXT)
    );
    assert!(notifications(&effects).is_empty());
    assert_eq!(workflow.mode(), UiMode::Editing);
}

#[test]
fn typing_before_fetch_completes_keeps_user_text() {
    let (workflow, effects) = compiled().apply(Command::OpenEditor);
    let ticket = only_request(&effects).ticket();
    let (workflow, _) = workflow.apply(Command::EditSource("my draft".into()));
    let (workflow, effects) = workflow.apply(Completion::SourceFetched {
        ticket,
        result: Ok("server text".into()),
    });

    assert_eq!(workflow.editor().map(Editor::text), Some("my draft"));
    assert_eq!(
        effects,
        vec![Effect::FillEditor {
            text: "my draft".into()
        }]
    );
}

#[test]
fn save_sends_buffer_and_stays_editing_on_success() {
    let workflow = editing("original");
    let (workflow, _) = workflow.apply(Command::EditSource("edited".into()));
    let (workflow, effects) = workflow.apply(Command::SaveRefresh);
    assert_eq!(workflow.mode(), UiMode::Editing);

    let request = only_request(&effects);
    match &request {
        Request::RecompileSource { submission, .. } => {
            assert_eq!(submission.source, "edited");
            assert_eq!(submission.filename, "talk.igtex");
            assert_eq!(submission.folder.as_str(), "talk_1712345678901234");
        }
        other => panic!("unexpected request: {other:?}"),
    }

    let (workflow, effects) = workflow.apply(Completion::Compiled {
        ticket: request.ticket(),
        result: Ok(CompileResponse::new(ARTIFACT_PATH)),
    });
    assert_eq!(workflow.mode(), UiMode::Editing);
    assert_eq!(workflow.editor().map(Editor::text), Some("edited"));
    assert!(effects.contains(&Effect::RevealPreview));
    assert_eq!(workflow.preview().map(|p| p.open), Some(true));
}

#[test]
fn failed_save_keeps_editing_buffer_and_raises_one_notification() {
    let workflow = editing("original");
    let (before, _) = workflow.apply(Command::EditSource("unsaved work".into()));
    let (workflow, effects) = before.clone().apply(Command::SaveRefresh);
    let ticket = only_request(&effects).ticket();
    let (workflow, effects) = workflow.apply(Completion::Compiled {
        ticket,
        result: Err(ServiceError::transport(anyhow!("timed out"))),
    });

    assert_eq!(workflow.mode(), UiMode::Editing);
    assert_eq!(workflow.editor().map(Editor::text), Some("unsaved work"));
    assert_eq!(notifications(&effects), vec!["Save failed"]);
    assert_eq!(workflow.session(), before.session());
    assert_eq!(workflow.staging(), before.staging());
}

#[test]
fn editor_gates_on_document_required_media() {
    let workflow = uploaded(&["logo.png"]);
    let (workflow, _) = workflow.apply(Command::StageMedia(media("logo.png")));
    let (workflow, effects) = workflow.apply(Command::Compile);
    let ticket = only_request(&effects).ticket();
    let (workflow, _) = workflow.apply(Completion::Compiled {
        ticket,
        result: Ok(CompileResponse::new(ARTIFACT_PATH)),
    });
    let (workflow, effects) = workflow.apply(Command::OpenEditor);
    let (workflow, _) = workflow.apply(Completion::SourceFetched {
        ticket: only_request(&effects).ticket(),
        result: Ok("\\image{logo.png}".into()),
    });

    let (workflow, effects) = workflow.apply(Command::SaveRefresh);
    assert!(requests(&effects).is_empty());
    assert_eq!(notifications(&effects), vec!["Missing media files: logo.png"]);

    let (workflow, _) = workflow.apply(Command::StageMedia(media("logo.png")));
    let (_, effects) = workflow.apply(Command::SaveRefresh);
    assert_eq!(requests(&effects).len(), 1);
}

#[test]
fn saving_waits_for_the_source_to_load() {
    let (loading, effects) = compiled().apply(Command::OpenEditor);
    let fetch = only_request(&effects).ticket();
    assert!(loading.editor().expect("editor").is_loading());

    let (workflow, effects) = loading.clone().apply(Command::SaveRefresh);
    assert!(effects.is_empty());
    assert_eq!(workflow, loading);

    let (workflow, effects) = workflow.apply(Command::KeyPressed(Key::F5));
    assert_eq!(effects, vec![Effect::SuppressKeyDefault(Key::F5)]);
    assert_eq!(workflow.in_flight(), None);

    let (workflow, effects) = workflow.apply(Command::CompileFromEditor);
    assert!(effects.is_empty());
    assert_eq!(workflow.mode(), UiMode::Editing);

    let (workflow, _) = workflow.apply(Completion::SourceFetched {
        ticket: fetch,
        result: Ok("\\section{Loaded}".into()),
    });
    let (_, effects) = workflow.apply(Command::KeyPressed(Key::F5));
    match only_request(&effects) {
        Request::RecompileSource { submission, .. } => {
            assert_eq!(submission.source, "\\section{Loaded}")
        }
        other => panic!("unexpected request: {other:?}"),
    }
}

#[test]
fn typed_text_can_be_saved_while_the_source_loads() {
    let (workflow, _) = compiled().apply(Command::OpenEditor);
    let (workflow, _) = workflow.apply(Command::EditSource("typed first".into()));
    let (workflow, effects) = workflow.apply(Command::SaveRefresh);

    match only_request(&effects) {
        Request::RecompileSource { submission, .. } => {
            assert_eq!(submission.source, "typed first")
        }
        other => panic!("unexpected request: {other:?}"),
    }
    assert!(workflow.editor().expect("editor").is_loading());
}

#[test]
fn refresh_key_is_intercepted_only_while_editing() {
    let (_, effects) = compiled().apply(Command::KeyPressed(Key::F5));
    assert!(effects.is_empty());

    let (workflow, effects) = editing("text").apply(Command::KeyPressed(Key::F5));
    assert_eq!(effects[0], Effect::SuppressKeyDefault(Key::F5));
    assert!(matches!(
        only_request(&effects),
        Request::RecompileSource { .. }
    ));
    assert_eq!(workflow.mode(), UiMode::Editing);
}

#[test]
fn compile_from_editor_returns_to_compiled_with_new_download() {
    let new_path = "/static/uploads/talk_1712345678901234/output.html";
    let (workflow, effects) = editing("text").apply(Command::CompileFromEditor);
    assert_eq!(workflow.mode(), UiMode::Compiling);
    let ticket = only_request(&effects).ticket();
    let (workflow, effects) = workflow.apply(Completion::Compiled {
        ticket,
        result: Ok(CompileResponse::new(new_path)),
    });

    assert_eq!(workflow.mode(), UiMode::Compiled);
    assert!(workflow.editor().is_none());
    assert!(effects.contains(&Effect::ShowArtifactActions {
        download: new_path.to_string()
    }));
}

#[test]
fn failed_compile_from_editor_returns_to_editing() {
    let (workflow, effects) = editing("text").apply(Command::CompileFromEditor);
    let ticket = only_request(&effects).ticket();
    let (workflow, effects) = workflow.apply(Completion::Compiled {
        ticket,
        result: Err(ServiceError::Malformed("not json".into())),
    });

    assert_eq!(workflow.mode(), UiMode::Editing);
    assert_eq!(workflow.editor().map(Editor::text), Some("text"));
    assert_eq!(notifications(&effects), vec!["Compilation failed"]);
}

#[test]
fn blank_document_goes_straight_to_editing_with_template() {
    let (workflow, effects) = Workflow::default().apply(Command::CreateBlank);
    let upload = only_request(&effects);
    match &upload {
        Request::UploadDocument { document, .. } => {
            assert_eq!(document.filename, BLANK_DOCUMENT_NAME);
            assert_eq!(document.contents, BLANK_DOCUMENT_TEMPLATE.as_bytes());
        }
        other => panic!("unexpected request: {other:?}"),
    }

    let (workflow, effects) = workflow.apply(Completion::Uploaded {
        ticket: upload.ticket(),
        result: Ok(upload_response("main_1712345678901234", &[])),
    });
    let compile = only_request(&effects);
    assert!(matches!(&compile, Request::CompileMedia { media, .. } if media.is_empty()));
    assert_eq!(workflow.mode(), UiMode::Compiling);
    assert!(workflow.session().is_none());

    let (workflow, effects) = workflow.apply(Completion::Compiled {
        ticket: compile.ticket(),
        result: Ok(CompileResponse::new(
            "/static/uploads/main_1712345678901234/output.html",
        )),
    });

    assert_eq!(workflow.mode(), UiMode::Editing);
    assert_eq!(
        workflow.editor().map(Editor::text),
        Some(BLANK_DOCUMENT_TEMPLATE)
    );
    assert_eq!(
        workflow.session().and_then(Session::filename),
        Some(BLANK_DOCUMENT_NAME)
    );
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::ShowArtifactActions { .. })));
    assert!(requests(&effects).is_empty());
}

#[test]
fn blank_document_compile_failure_aborts_without_editor() {
    let before = compiled();
    let (workflow, effects) = before.clone().apply(Command::CreateBlank);
    let (workflow, effects) = workflow.apply(Completion::Uploaded {
        ticket: only_request(&effects).ticket(),
        result: Ok(upload_response("main_1", &[])),
    });
    let (workflow, effects) = workflow.apply(Completion::Compiled {
        ticket: only_request(&effects).ticket(),
        result: Err(ServiceError::transport(anyhow!("502"))),
    });

    assert_eq!(notifications(&effects), vec!["Blank document creation failed"]);
    assert_eq!(workflow.mode(), UiMode::Compiled);
    assert_eq!(workflow.session(), before.session());
    assert!(workflow.editor().is_none());
}

#[test]
fn toggle_preview_flips_visibility() {
    let workflow = compiled();
    let (workflow, effects) = workflow.apply(Command::TogglePreview);
    assert_eq!(effects, vec![Effect::CollapsePreview]);
    assert_eq!(workflow.preview().map(|p| p.open), Some(false));

    let (workflow, effects) = workflow.apply(Command::TogglePreview);
    assert_eq!(effects, vec![Effect::RevealPreview]);
    assert_eq!(workflow.preview().map(|p| p.open), Some(true));
}
