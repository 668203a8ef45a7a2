//! Solvebook renderer
//!
//! Turns markdown+LaTeX solution text into sanitized preview HTML: GitHub-style
//! markdown, MathML formulas and class-based syntax highlighting. Rendering is
//! synchronous, deterministic and never fails on malformed input.

use std::panic::{AssertUnwindSafe, catch_unwind};
#[cfg(feature = "syntax-highlighting")]
use std::sync::{Arc, LazyLock};

use pulldown_cmark::Parser;
#[cfg(feature = "syntax-highlighting")]
use syntect::parsing::SyntaxSet;

#[cfg(feature = "syntax-highlighting")]
pub mod code_pretty;
#[cfg(all(
    feature = "syntax-css",
    not(all(target_family = "wasm", target_os = "unknown"))
))]
pub mod css;
pub mod error;
pub mod math;
pub mod options;
pub mod preprocess;
pub mod writer;

pub use error::{RenderError, RenderWarning};
pub use options::{RenderOptions, default_md_options};

use crate::preprocess::{Preprocessed, extract_math};
use crate::writer::HtmlWriter;

/// Shown for empty or whitespace-only input.
pub const EMPTY_PLACEHOLDER: &str = r#"<p class="sb-empty">Nothing to preview yet.</p>"#;

/// Shown when a render pass fails as a whole.
pub const RENDER_ERROR_PLACEHOLDER: &str =
    r#"<p class="sb-render-error">Preview could not be rendered.</p>"#;

#[cfg(feature = "syntax-highlighting")]
static SYNTAX_SET: LazyLock<Arc<SyntaxSet>> =
    LazyLock::new(|| Arc::new(SyntaxSet::load_defaults_newlines()));

/// The result of one render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub html: String,
    /// Formulas and code blocks that failed and were written in a fallback form.
    pub warnings: Vec<RenderWarning>,
}

impl RenderOutput {
    fn placeholder() -> Self {
        Self {
            html: EMPTY_PLACEHOLDER.to_string(),
            warnings: Vec::new(),
        }
    }
}

/// Anything that can turn source text into preview HTML.
pub trait RenderPipeline {
    fn render(&self, source: &str) -> Result<RenderOutput, RenderError>;

    /// Render, substituting the error placeholder on failure.
    fn render_html(&self, source: &str) -> String {
        match self.render(source) {
            Ok(output) => output.html,
            Err(err) => {
                tracing::warn!(error = %err, "render failed, showing placeholder");
                RENDER_ERROR_PLACEHOLDER.to_string()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    options: RenderOptions,
    #[cfg(feature = "syntax-highlighting")]
    syntax_set: Arc<SyntaxSet>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            #[cfg(feature = "syntax-highlighting")]
            syntax_set: SYNTAX_SET.clone(),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `source`, containing any panic from the markdown, math or
    /// highlighting layers.
    pub fn try_render(&self, source: &str) -> Result<RenderOutput, RenderError> {
        if source.trim().is_empty() {
            return Ok(RenderOutput::placeholder());
        }
        match catch_unwind(AssertUnwindSafe(|| self.render_inner(source))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(%message, "renderer panicked");
                Err(RenderError::Panicked { message })
            }
        }
    }

    fn render_inner(&self, source: &str) -> Result<RenderOutput, RenderError> {
        let math = if self.options.math {
            extract_math(source)
        } else {
            Preprocessed {
                text: source.to_string(),
                spans: Vec::new(),
            }
        };
        let parser = Parser::new_ext(&math.text, self.options.md_options());

        let mut html = String::with_capacity(source.len() * 3 / 2);
        let writer = HtmlWriter::new(parser, &mut html, &self.options, &math);
        #[cfg(feature = "syntax-highlighting")]
        let writer = writer.with_syntax_set(&self.syntax_set);
        let warnings = writer.run().map_err(|_| RenderError::Write)?;

        tracing::debug!(
            bytes = source.len(),
            formulas = math.spans.len(),
            warnings = warnings.len(),
            "rendered preview"
        );
        Ok(RenderOutput { html, warnings })
    }
}

impl RenderPipeline for Renderer {
    fn render(&self, source: &str) -> Result<RenderOutput, RenderError> {
        self.try_render(source)
    }
}

/// Render with default options.
pub fn render_markdown(source: &str) -> String {
    Renderer::default().render_html(source)
}

/// Stylesheet for highlighted code, light and dark.
#[cfg(all(
    feature = "syntax-css",
    not(all(target_family = "wasm", target_os = "unknown"))
))]
pub fn syntax_css() -> miette::Result<String> {
    css::generate_default_css()
}
