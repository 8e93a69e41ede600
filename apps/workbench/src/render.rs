use client_core::{
    notifications::Notification,
    view::{Action, View},
    workflow::Request,
    Effect, Key,
};

/// Console line for an effect, or `None` when the view already shows it.
pub fn describe(effect: &Effect) -> Option<String> {
    let line = match effect {
        Effect::Request(request) => match request {
            Request::UploadDocument { document, .. } => format!("uploading {}", document.filename),
            Request::CompileMedia { folder, media, .. } => {
                format!("compiling {folder} with {} media file(s)", media.len())
            }
            Request::RecompileSource { submission, .. } => {
                format!("recompiling {}", submission.filename)
            }
            Request::FetchSource { path, .. } => format!("fetching {path}"),
        },
        Effect::ShowMediaZone { required } if required.is_empty() => {
            "document needs no media; ready to compile".to_string()
        }
        Effect::ShowMediaZone { required } => format!("drop media: {}", required.join(", ")),
        Effect::MediaReady { staged } => format!("files ready: {}", staged.join(", ")),
        Effect::ShowPreview { path } => format!("preview: {path}"),
        Effect::ShowArtifactActions { download } => format!("download: {download}"),
        Effect::SuppressKeyDefault(Key::F5) => "F5 intercepted".to_string(),
        Effect::Notify { message } => format!("! {message}"),
        Effect::RevealPreview
        | Effect::CollapsePreview
        | Effect::ShowEditor { .. }
        | Effect::FillEditor { .. }
        | Effect::SuppressKeyDefault(Key::Other(_)) => return None,
    };
    Some(line)
}

fn action_label(action: &Action) -> String {
    match action {
        Action::Compile => "compile".into(),
        Action::Download { href } => format!("download ({href})"),
        Action::Edit => "edit".into(),
        Action::Save => "save".into(),
        Action::CompileFromEditor => "build".into(),
    }
}

pub fn render_view(view: &View, notifications: &[Notification]) -> String {
    let mut out = format!("mode: {:?}", view.mode);

    if let Some(zone) = &view.media_zone {
        let missing = zone.missing();
        out.push_str(&format!(
            "\nmedia: required [{}] staged [{}]",
            zone.required.join(", "),
            zone.staged.join(", ")
        ));
        if !missing.is_empty() {
            out.push_str(&format!(" missing [{}]", missing.join(", ")));
        }
    }

    if !view.actions.is_empty() {
        let labels: Vec<String> = view.actions.iter().map(action_label).collect();
        let state = if view.actions_enabled { "" } else { " (busy)" };
        out.push_str(&format!("\nactions{state}: {}", labels.join(" | ")));
    }

    if let Some(editor) = &view.editor {
        match editor.placeholder {
            Some(placeholder) => out.push_str(&format!("\neditor: {placeholder}")),
            None => out.push_str(&format!("\neditor: {} line(s)", editor.text.lines().count())),
        }
    }

    if let Some(preview) = &view.preview {
        let state = if preview.open { "open" } else { "collapsed" };
        out.push_str(&format!("\npreview ({state}): {}", preview.path));
    }

    for notification in notifications {
        for line in notification.lines() {
            out.push_str(&format!("\n[{}] {line}", notification.id.0));
        }
    }
    out
}
