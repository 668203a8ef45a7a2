//! Stylesheet generation for highlighted code.

use miette::IntoDiagnostic;
use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, css_for_theme_with_class_style};

use crate::code_pretty::CSS_PREFIX;

pub const DEFAULT_LIGHT_THEME: &str = "InspiredGitHub";
pub const DEFAULT_DARK_THEME: &str = "base16-ocean.dark";

/// Base rules for the preview pane itself: placeholders, math and code blocks.
const PREVIEW_CSS: &str = r#".sb-empty, .sb-render-error { color: #888; font-style: italic; }
.sb-render-error { color: #b4637a; }
.math-display { display: block; overflow-x: auto; text-align: center; margin: 0.5em 0; }
.math-error { color: #b4637a; }
pre.sb-code { overflow-x: auto; padding: 0.75em; border-radius: 4px; }
"#;

/// Generate light (default) and dark syntax CSS from two bundled themes.
pub fn generate_syntax_css(light: &str, dark: &str) -> miette::Result<String> {
    let theme_set = ThemeSet::load_defaults();
    let light_theme = theme_set
        .themes
        .get(light)
        .ok_or_else(|| miette::miette!("Unknown syntax theme: {light}"))?;
    let dark_theme = theme_set
        .themes
        .get(dark)
        .ok_or_else(|| miette::miette!("Unknown syntax theme: {dark}"))?;

    let light_css = css_for_theme_with_class_style(
        light_theme,
        ClassStyle::SpacedPrefixed { prefix: CSS_PREFIX },
    )
    .into_diagnostic()?;
    let dark_css = css_for_theme_with_class_style(
        dark_theme,
        ClassStyle::SpacedPrefixed { prefix: CSS_PREFIX },
    )
    .into_diagnostic()?;

    let mut result = String::new();
    result.push_str(PREVIEW_CSS);
    result.push_str("\n/* Syntax highlighting - Light Mode (default) */\n");
    result.push_str(&light_css);
    result.push_str("\n\n/* Syntax highlighting - Dark Mode */\n");
    result.push_str("@media (prefers-color-scheme: dark) {\n");
    result.push_str(&dark_css);
    result.push_str("}\n");
    Ok(result)
}

pub fn generate_default_css() -> miette::Result<String> {
    generate_syntax_css(DEFAULT_LIGHT_THEME, DEFAULT_DARK_THEME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_css_has_both_modes() {
        let css = generate_default_css().unwrap();
        assert!(css.contains(".sb-"));
        assert!(css.contains("prefers-color-scheme: dark"));
        assert!(css.contains(".math-display"));
    }

    #[test]
    fn unknown_theme_is_an_error() {
        assert!(generate_syntax_css("no-such-theme", DEFAULT_DARK_THEME).is_err());
    }
}
