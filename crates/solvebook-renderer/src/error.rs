use smol_str::SmolStr;

/// A render pass that could not produce output at all.
///
/// Per-formula and per-block problems are not errors; they come back as
/// [`RenderWarning`]s alongside otherwise complete HTML.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, miette::Diagnostic)]
pub enum RenderError {
    #[error("renderer panicked: {message}")]
    #[diagnostic(
        code(solvebook::render::panic),
        help("the preview shows the error placeholder; the source text is untouched")
    )]
    Panicked { message: String },

    #[error("failed to write rendered HTML")]
    #[diagnostic(code(solvebook::render::write))]
    Write,
}

/// A contained failure inside an otherwise successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderWarning {
    /// A formula failed to typeset and was replaced with an error span.
    Math { source: String, message: String },
    /// A code block failed to highlight and was written as plain text.
    Highlight {
        lang: Option<SmolStr>,
        message: String,
    },
}

impl std::fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderWarning::Math { source, message } => {
                write!(f, "formula `{source}` failed: {message}")
            }
            RenderWarning::Highlight {
                lang: Some(lang),
                message,
            } => write!(f, "`{lang}` code block not highlighted: {message}"),
            RenderWarning::Highlight { lang: None, message } => {
                write!(f, "code block not highlighted: {message}")
            }
        }
    }
}
