use pulldown_cmark::Options;
use serde::{Deserialize, Serialize};

/// Knobs for the markdown+LaTeX pipeline.
///
/// Every field has a default so a partial JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Render a single newline inside a paragraph as `<br />`.
    pub hard_breaks: bool,
    pub tables: bool,
    pub strikethrough: bool,
    pub tasklists: bool,
    pub footnotes: bool,
    /// Typeset `$…$`, `$$…$$`, `\(…\)` and `\[…\]`.
    pub math: bool,
    /// Syntax-highlight code blocks (when built with `syntax-highlighting`).
    pub highlight: bool,
    /// Pass raw HTML from the source through instead of escaping it.
    pub allow_raw_html: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            hard_breaks: true,
            tables: true,
            strikethrough: true,
            tasklists: true,
            footnotes: false,
            math: true,
            highlight: true,
            allow_raw_html: false,
        }
    }
}

impl RenderOptions {
    pub fn md_options(&self) -> Options {
        let mut options = Options::empty();
        options.set(Options::ENABLE_TABLES, self.tables);
        options.set(Options::ENABLE_STRIKETHROUGH, self.strikethrough);
        options.set(Options::ENABLE_TASKLISTS, self.tasklists);
        options.set(Options::ENABLE_FOOTNOTES, self.footnotes);
        options
    }
}

pub fn default_md_options() -> Options {
    RenderOptions::default().md_options()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let opts: RenderOptions = serde_json::from_str(r#"{"allow_raw_html": true}"#).unwrap();
        assert!(opts.allow_raw_html);
        assert!(opts.hard_breaks);
        assert!(opts.math);
    }

    #[test]
    fn md_options_follow_flags() {
        let opts = RenderOptions {
            tables: false,
            footnotes: true,
            ..Default::default()
        };
        let md = opts.md_options();
        assert!(!md.contains(Options::ENABLE_TABLES));
        assert!(md.contains(Options::ENABLE_FOOTNOTES));
        assert!(md.contains(Options::ENABLE_STRIKETHROUGH));
    }
}
