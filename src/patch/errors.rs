use thiserror::Error;

/// Failures raised while a patch computes a replacement.
///
/// None of these are recoverable inside a run: each one means the include
/// table or the patch's pattern is out of date for the input being translated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("unknown profile '{profile}' (known profiles: {})", .known.join(", "))]
    UnknownProfile { profile: String, known: Vec<String> },

    #[error(
        "no include block for '{filename}' under profile '{profile}'{}",
        .suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default()
    )]
    UnknownFileForProfile {
        profile: String,
        filename: String,
        suggestion: Option<String>,
    },

    #[error("patch '{patch}' matched in '{filename}' without its main capture '@{capture}'")]
    MalformedMatch {
        patch: &'static str,
        capture: String,
        filename: String,
    },
}
