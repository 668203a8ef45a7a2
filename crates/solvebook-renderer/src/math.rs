//! LaTeX typesetting via pulldown-latex → MathML

use pulldown_cmark_escape::escape_html;
use pulldown_latex::{
    Parser, Storage, config::DisplayMode, config::RenderConfig, mathml::push_mathml,
};

/// Result of attempting to typeset one formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MathResult {
    /// Successfully rendered, wrapped in its `math` span
    Success(String),
    /// Typesetting failed - contains fallback HTML with the source and error message
    Error { html: String, message: String },
}

impl MathResult {
    /// The HTML to splice into the page, whichever way typesetting went.
    pub fn html(&self) -> &str {
        match self {
            MathResult::Success(html) => html,
            MathResult::Error { html, .. } => html,
        }
    }
}

/// Typesets the formulas of one render pass.
///
/// Every formula of a document is parsed into the same arena.
pub struct Typesetter {
    storage: Storage,
}

impl Default for Typesetter {
    fn default() -> Self {
        Self::new()
    }
}

impl Typesetter {
    pub fn new() -> Self {
        Self {
            storage: Storage::new(),
        }
    }

    /// Typeset `tex` (without its delimiters) to MathML.
    ///
    /// Never fails outright: a bad formula comes back as
    /// [`MathResult::Error`] carrying an inline error span.
    pub fn typeset(&self, tex: &str, display: bool) -> MathResult {
        let events: Vec<_> = Parser::new(tex, &self.storage).collect();
        let parse_errors: Vec<String> = events
            .iter()
            .filter_map(|event| event.as_ref().err())
            .map(ToString::to_string)
            .collect();
        if !parse_errors.is_empty() {
            return failed(tex, parse_errors.join("; "), display);
        }

        let config = RenderConfig {
            display_mode: if display {
                DisplayMode::Block
            } else {
                DisplayMode::Inline
            },
            ..Default::default()
        };
        let mut html = format!(r#"<span class="{}">"#, span_classes(display, false));
        if let Err(err) = push_mathml(&mut html, events.into_iter(), config) {
            return failed(tex, err.to_string(), display);
        }
        html.push_str("</span>");
        MathResult::Success(html)
    }
}

fn span_classes(display: bool, error: bool) -> &'static str {
    match (display, error) {
        (false, false) => "math math-inline",
        (true, false) => "math math-display",
        (false, true) => "math math-error math-inline",
        (true, true) => "math math-error math-display",
    }
}

fn failed(tex: &str, message: String, display: bool) -> MathResult {
    let mut html = format!(r#"<span class="{}" title=""#, span_classes(display, true));
    // Writing into a String cannot fail.
    let _ = escape_html(&mut html, &message);
    html.push_str(r#""><code>"#);
    let _ = escape_html(&mut html, tex);
    html.push_str("</code></span>");
    MathResult::Error { html, message }
}
