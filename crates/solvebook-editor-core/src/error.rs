use miette::Diagnostic;
use smol_str::SmolStr;
use solvebook_renderer::RenderError;
use thiserror::Error;

use crate::types::EditorId;

/// A DOM (or other host) call that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{0}")]
#[diagnostic(code(solvebook::platform))]
pub struct PlatformError(pub String);

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

/// Everything that can go wrong between an editor, its preview and the host form.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum EditorError {
    #[error("no container `{container}` for editor `{id}`")]
    #[diagnostic(
        code(editor::missing_target),
        help("the editor runs as a detached no-op; add an element with id `{container}`")
    )]
    MissingTarget { id: EditorId, container: SmolStr },

    #[error("{message}")]
    #[diagnostic(code(form::validation))]
    Validation { field: SmolStr, message: String },

    #[error("editor `{id}` is still initializing")]
    #[diagnostic(code(form::not_ready), help("retry once the editor has mounted"))]
    NotReady { id: EditorId },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),

    #[error("failed to write form field `{field}`")]
    #[diagnostic(code(form::serialization))]
    Serialization {
        field: SmolStr,
        #[source]
        source: PlatformError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Platform(#[from] PlatformError),
}

/// Configuration that could not be parsed or is out of range.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid editor configuration")]
    #[diagnostic(
        code(config::parse),
        help("the configuration is a JSON object and every key is optional")
    )]
    Parse(#[from] serde_json::Error),

    #[error("debounce_ms must be between 1 and 60000, got {0}")]
    #[diagnostic(code(config::debounce))]
    Debounce(u64),

    #[error("autosave interval_ms must be at least 250, got {0}")]
    #[diagnostic(code(config::autosave_interval))]
    AutosaveInterval(u64),
}
