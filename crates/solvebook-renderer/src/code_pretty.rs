//! Code block highlighting with syntect.
//!
//! Output uses CSS classes rather than inline styles so the same markup works
//! with the light and dark stylesheets produced by [`crate::css`].

use pulldown_cmark_escape::escape_html;
use smol_str::SmolStr;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::writer::write_plain_block;

/// Prefix applied to every highlighting class.
pub const CSS_PREFIX: &str = "sb-";

/// Tags people write that are not syntect tokens, mapped to ones that are.
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("c++", "cpp"),
    ("cplusplus", "cpp"),
    ("cxx", "cpp"),
    ("python", "py"),
    ("python3", "py"),
    ("py3", "py"),
    ("javascript", "js"),
    ("node", "js"),
    // No TypeScript grammar is bundled; JavaScript is the closest fit.
    ("typescript", "js"),
    ("ts", "js"),
    ("golang", "go"),
    ("shell", "sh"),
    ("bash", "sh"),
    ("zsh", "sh"),
    ("console", "sh"),
    ("rust", "rs"),
    ("csharp", "cs"),
    ("c#", "cs"),
    ("pascal", "pas"),
    ("ruby", "rb"),
    ("haskell", "hs"),
];

/// Keyword fingerprints used when a block carries no usable language tag.
const DETECTION_RULES: &[(&str, &[&str])] = &[
    (
        "cpp",
        &[
            "#include",
            "std::",
            "using namespace",
            "cout",
            "cin >>",
            "vector<",
            "int main(",
        ],
    ),
    (
        "py",
        &[
            "def ", "import ", "print(", "elif ", "self.", "range(", "__name__",
        ],
    ),
    (
        "rs",
        &["fn ", "let mut ", "impl ", "pub fn", "println!", "::new("],
    ),
    (
        "java",
        &[
            "public class",
            "public static void",
            "System.out",
            "import java.",
        ],
    ),
    (
        "go",
        &["package main", "func ", ":= ", "fmt."],
    ),
    (
        "cs",
        &["using System", "Console.Write", "namespace "],
    ),
    (
        "js",
        &["function ", "const ", "=> ", "console.log", "let "],
    ),
    ("sh", &["#!/bin/", "echo ", "fi\n", "$("]),
    (
        "sql",
        &["SELECT ", "INSERT INTO", "CREATE TABLE", " FROM "],
    ),
];

/// How the language of a block was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageChoice {
    /// The block's tag named a known language.
    Tagged(SmolStr),
    /// The tag was missing or unknown and the content gave it away.
    Detected(SmolStr),
    /// Nothing matched; rendered as escaped plain text.
    Plain,
}

/// Resolve a fence tag (or its absence) to a syntax, falling back to detection.
pub fn resolve_syntax<'s>(
    syntax_set: &'s SyntaxSet,
    lang: Option<&str>,
    code: &str,
) -> Option<(&'s SyntaxReference, LanguageChoice)> {
    if let Some(tag) = lang.map(str::trim).filter(|t| !t.is_empty()) {
        let lowered = tag.to_ascii_lowercase();
        let token = LANGUAGE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == lowered)
            .map_or(lowered.as_str(), |(_, token)| *token);
        if let Some(syntax) = syntax_set.find_syntax_by_token(token) {
            return Some((syntax, LanguageChoice::Tagged(SmolStr::new(tag))));
        }
        tracing::debug!(tag, "unknown code block language, detecting");
    }

    let first_line = code.lines().next().unwrap_or_default();
    if let Some(syntax) = syntax_set.find_syntax_by_first_line(first_line) {
        return Some((syntax, LanguageChoice::Detected(class_token(&syntax.name))));
    }

    let token = detect_token(code)?;
    let syntax = syntax_set.find_syntax_by_token(token)?;
    Some((syntax, LanguageChoice::Detected(class_token(&syntax.name))))
}

/// Guess a syntect token from keyword fingerprints.
///
/// Needs at least two distinct hits so a stray `print(` in prose-like text
/// doesn't get painted as Python.
pub fn detect_token(code: &str) -> Option<&'static str> {
    let mut best: Option<(&'static str, usize)> = None;
    for &(token, needles) in DETECTION_RULES {
        let score = needles.iter().filter(|n| code.contains(*n)).count();
        if score >= 2 && best.is_none_or(|(_, s)| score > s) {
            best = Some((token, score));
        }
    }
    best.map(|(token, _)| token)
}

fn class_token(name: &str) -> SmolStr {
    let lowered: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '+' || c == '#' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    SmolStr::new(lowered)
}

/// Highlight a code block and write it as `<pre><code>` into `out`.
///
/// Returns how the language was chosen. On a highlighting error nothing is
/// written, so the caller can fall back to a plain block.
pub fn highlight(
    syntax_set: &SyntaxSet,
    lang: Option<&str>,
    code: &str,
    out: &mut String,
) -> Result<LanguageChoice, syntect::Error> {
    let Some((syntax, choice)) = resolve_syntax(syntax_set, lang, code) else {
        // Infallible for a String.
        let _ = write_plain_block(out, lang, code);
        return Ok(LanguageChoice::Plain);
    };

    let mut generator = ClassedHTMLGenerator::new_with_class_style(
        syntax,
        syntax_set,
        ClassStyle::SpacedPrefixed { prefix: CSS_PREFIX },
    );
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    let body = generator.finalize();

    let class = match &choice {
        LanguageChoice::Tagged(tag) => tag.clone(),
        LanguageChoice::Detected(token) => token.clone(),
        LanguageChoice::Plain => SmolStr::default(),
    };
    out.push_str(r#"<pre class="sb-code"><code class="language-"#);
    let _ = escape_html(&mut *out, &class);
    out.push_str(r#"">"#);
    out.push_str(&body);
    out.push_str("</code></pre>\n");
    Ok(choice)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntaxes() -> SyntaxSet {
        SyntaxSet::load_defaults_newlines()
    }

    #[test]
    fn tagged_language_is_used() {
        let ss = syntaxes();
        let mut out = String::new();
        let choice = highlight(&ss, Some("rust"), "fn main() {}\n", &mut out).unwrap();
        assert_eq!(choice, LanguageChoice::Tagged("rust".into()));
        assert!(out.starts_with(r#"<pre class="sb-code"><code class="language-rust">"#));
        assert!(out.contains("sb-"));
        assert!(out.ends_with("</code></pre>\n"));
    }

    #[test]
    fn aliases_resolve() {
        let ss = syntaxes();
        for tag in ["c++", "python", "golang", "bash", "ts"] {
            let resolved = resolve_syntax(&ss, Some(tag), "");
            assert!(
                matches!(resolved, Some((_, LanguageChoice::Tagged(_)))),
                "{tag} did not resolve"
            );
        }
    }

    #[test]
    fn unknown_tag_falls_back_to_detection() {
        let ss = syntaxes();
        let code = "#include <bits/stdc++.h>\nusing namespace std;\nint main() { return 0; }\n";
        let (syntax, choice) = resolve_syntax(&ss, Some("not-a-language"), code).unwrap();
        assert!(matches!(choice, LanguageChoice::Detected(_)));
        assert_eq!(syntax.name, "C++");
    }

    #[test]
    fn shebang_detects_from_first_line() {
        let ss = syntaxes();
        let (_, choice) = resolve_syntax(&ss, None, "#!/usr/bin/env python\nx = 1\n").unwrap();
        assert!(matches!(choice, LanguageChoice::Detected(_)));
    }

    #[test]
    fn undetectable_code_is_plain_and_escaped() {
        let ss = syntaxes();
        let mut out = String::new();
        let choice = highlight(&ss, None, "a < b\n", &mut out).unwrap();
        assert_eq!(choice, LanguageChoice::Plain);
        assert_eq!(out, "<pre class=\"sb-code\"><code>a &lt; b\n</code></pre>\n");
    }

    #[test]
    fn detection_needs_two_hits() {
        assert_eq!(detect_token("print(x)"), None);
        assert_eq!(detect_token("def f():\n    print(x)\n"), Some("py"));
    }
}
