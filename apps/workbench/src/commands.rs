use std::path::PathBuf;

use thiserror::Error;

/// One line typed at the workbench prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Submit(Option<PathBuf>),
    Media(Vec<PathBuf>),
    Compile,
    Edit,
    Save,
    Build,
    Blank,
    TogglePreview,
    RefreshKey,
    Status,
    Dismiss(Option<u64>),
    Help,
    Quit,
    Empty,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{command}' needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    #[error("'{0}' is not a notification id")]
    InvalidId(String),
}

pub const HELP: &str = "\
commands:
  submit [path]      upload an .igtex document
  media <path>...    stage media files for the current document
  compile            compile the uploaded document with the staged media
  edit               open the compiled document's source
  save | f5          save the editor buffer and refresh the preview
  build              compile the editor buffer and leave the editor
  blank              create and open a blank document
  toggle             show or hide the preview
  status             print the current view
  dismiss [id]       dismiss one notification, or all of them
  quit";

pub fn parse_line(line: &str) -> Result<Input, ParseError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(Input::Empty);
    };
    let rest: Vec<&str> = words.collect();

    let input = match command.to_ascii_lowercase().as_str() {
        "submit" | "open" => Input::Submit(rest.first().map(PathBuf::from)),
        "media" | "stage" => {
            if rest.is_empty() {
                return Err(ParseError::MissingArgument {
                    command: "media",
                    what: "at least one file",
                });
            }
            Input::Media(rest.iter().map(PathBuf::from).collect())
        }
        "compile" => Input::Compile,
        "edit" => Input::Edit,
        "save" => Input::Save,
        "f5" => Input::RefreshKey,
        "build" => Input::Build,
        "blank" | "new" => Input::Blank,
        "toggle" | "preview" => Input::TogglePreview,
        "status" | "ls" => Input::Status,
        "dismiss" => match rest.first() {
            Some(raw) => Input::Dismiss(Some(
                raw.parse()
                    .map_err(|_| ParseError::InvalidId(raw.to_string()))?,
            )),
            None => Input::Dismiss(None),
        },
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(input)
}
