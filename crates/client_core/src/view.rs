use crate::workflow::{Preview, UiMode, Workflow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Compile,
    Download { href: String },
    Edit,
    Save,
    CompileFromEditor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaZone {
    pub required: Vec<String>,
    pub staged: Vec<String>,
}

impl MediaZone {
    pub fn missing(&self) -> Vec<&str> {
        self.required
            .iter()
            .filter(|name| !self.staged.contains(name))
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorView {
    pub text: String,
    pub placeholder: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub mode: UiMode,
    pub drop_target: bool,
    pub media_zone: Option<MediaZone>,
    pub actions: Vec<Action>,
    /// False while a request holds the workflow; actions render disabled.
    pub actions_enabled: bool,
    pub editor: Option<EditorView>,
    pub preview: Option<Preview>,
}

pub fn project(workflow: &Workflow) -> View {
    let settled = workflow.settled_mode();
    let required: Vec<String> = workflow
        .session()
        .map(|session| session.required_media().names().to_vec())
        .unwrap_or_default();
    let staged: Vec<String> = workflow
        .staging()
        .map(|staging| staging.filenames().map(str::to_owned).collect())
        .unwrap_or_default();

    let media_zone = match settled {
        UiMode::AwaitingMedia if !required.is_empty() => Some(MediaZone { required, staged }),
        UiMode::Editing => Some(MediaZone { required, staged }),
        _ => None,
    };

    let actions = match settled {
        UiMode::Idle | UiMode::Compiling => Vec::new(),
        UiMode::AwaitingMedia => vec![Action::Compile],
        UiMode::Compiled => workflow
            .session()
            .and_then(|session| session.artifact())
            .map(|artifact| {
                vec![
                    Action::Download {
                        href: artifact.path().to_string(),
                    },
                    Action::Edit,
                ]
            })
            .unwrap_or_default(),
        UiMode::Editing => vec![Action::Save, Action::CompileFromEditor],
    };

    View {
        mode: workflow.mode(),
        drop_target: settled != UiMode::Editing,
        media_zone,
        actions,
        actions_enabled: workflow.in_flight().is_none(),
        editor: workflow.editor().map(|editor| EditorView {
            text: editor.text().to_string(),
            placeholder: editor.placeholder(),
        }),
        preview: workflow.preview().cloned(),
    }
}
