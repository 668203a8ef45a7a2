//! Math delimiter extraction.
//!
//! LaTeX has to be pulled out of the source before markdown parsing: the
//! parser would otherwise treat `_` and `*` inside formulas as emphasis and eat
//! the backslash of `\(` as an escape. Each recognized span is replaced by an
//! inert token made of private-use characters, which the HTML writer swaps for
//! typeset MathML (or back to the original source inside code).
//!
//! Fenced code blocks and inline code spans are copied through untouched.

use std::borrow::Cow;

/// Opens a math token in the preprocessed text.
pub const TOKEN_OPEN: char = '\u{E000}';
/// Closes a math token in the preprocessed text.
pub const TOKEN_CLOSE: char = '\u{E001}';

/// A pair of math delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter {
    pub left: &'static str,
    pub right: &'static str,
    pub display: bool,
}

/// Recognized delimiters, in the order they are tried at any position.
///
/// The doubled-backslash forms are how `\(` and `\[` survive markdown escaping
/// in content written for a render-then-typeset pipeline.
pub const DELIMITERS: [Delimiter; 6] = [
    Delimiter {
        left: "$$",
        right: "$$",
        display: true,
    },
    Delimiter {
        left: "$",
        right: "$",
        display: false,
    },
    Delimiter {
        left: r"\(",
        right: r"\)",
        display: false,
    },
    Delimiter {
        left: r"\[",
        right: r"\]",
        display: true,
    },
    Delimiter {
        left: r"\\(",
        right: r"\\)",
        display: false,
    },
    Delimiter {
        left: r"\\[",
        right: r"\\]",
        display: true,
    },
];

/// One extracted formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathSpan {
    /// The span exactly as written, delimiters included.
    pub source: String,
    /// The TeX between the delimiters.
    pub tex: String,
    pub display: bool,
}

/// Source text with its formulas swapped out for tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preprocessed {
    pub text: String,
    pub spans: Vec<MathSpan>,
}

/// A piece of preprocessed text: either plain text or a formula reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Math(&'a MathSpan),
}

impl Preprocessed {
    /// Split text (usually a single parser text event) into plain and math segments.
    pub fn segments<'a>(&'a self, text: &'a str) -> Vec<Segment<'a>> {
        let mut segments = Vec::new();
        let mut rest = text;
        while let Some(open) = rest.find(TOKEN_OPEN) {
            let after = &rest[open + TOKEN_OPEN.len_utf8()..];
            let parsed = after.find(TOKEN_CLOSE).and_then(|close| {
                let index: usize = after[..close].parse().ok()?;
                let span = self.spans.get(index)?;
                Some((span, close))
            });
            match parsed {
                Some((span, close)) => {
                    if open > 0 {
                        segments.push(Segment::Text(&rest[..open]));
                    }
                    segments.push(Segment::Math(span));
                    rest = &after[close + TOKEN_CLOSE.len_utf8()..];
                }
                None => {
                    // Not one of ours, keep the character as text.
                    let end = open + TOKEN_OPEN.len_utf8();
                    segments.push(Segment::Text(&rest[..end]));
                    rest = &rest[end..];
                }
            }
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest));
        }
        segments
    }

    /// Put the original math source back in place of every token.
    ///
    /// Used wherever math must not be typeset: code, link targets, raw HTML.
    pub fn restore<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !text.contains(TOKEN_OPEN) {
            return Cow::Borrowed(text);
        }
        let mut restored = String::with_capacity(text.len());
        for segment in self.segments(text) {
            match segment {
                Segment::Text(t) => restored.push_str(t),
                Segment::Math(span) => restored.push_str(&span.source),
            }
        }
        Cow::Owned(restored)
    }
}

/// Pull every recognized formula out of `source`.
pub fn extract_math(source: &str) -> Preprocessed {
    // Stray sentinel characters in user input would be mistaken for tokens.
    let cleaned: Cow<'_, str> = if source.contains([TOKEN_OPEN, TOKEN_CLOSE]) {
        Cow::Owned(source.replace([TOKEN_OPEN, TOKEN_CLOSE], "\u{FFFD}"))
    } else {
        Cow::Borrowed(source)
    };

    let mut out = Preprocessed {
        text: String::with_capacity(cleaned.len()),
        spans: Vec::new(),
    };
    let mut prose = String::new();
    let mut fence: Option<(u8, usize)> = None;

    for line in cleaned.split_inclusive('\n') {
        match fence {
            Some((ch, len)) => {
                out.text.push_str(line);
                if closes_fence(line, ch, len) {
                    fence = None;
                }
            }
            None => {
                if let Some(opened) = opens_fence(line) {
                    scan_inline(&prose, &mut out);
                    prose.clear();
                    out.text.push_str(line);
                    fence = Some(opened);
                } else {
                    prose.push_str(line);
                }
            }
        }
    }
    scan_inline(&prose, &mut out);
    out
}

/// Strip up to three spaces of indentation, as CommonMark allows for fences.
fn fence_body(line: &str) -> Option<&str> {
    let indent = line.bytes().take_while(|b| *b == b' ').count();
    (indent <= 3).then(|| &line[indent..])
}

fn opens_fence(line: &str) -> Option<(u8, usize)> {
    let body = fence_body(line)?;
    let ch = *body.as_bytes().first()?;
    if ch != b'`' && ch != b'~' {
        return None;
    }
    let len = body.bytes().take_while(|b| *b == ch).count();
    if len < 3 {
        return None;
    }
    // A backtick fence's info string may not contain backticks.
    if ch == b'`' && body[len..].contains('`') {
        return None;
    }
    Some((ch, len))
}

fn closes_fence(line: &str, ch: u8, len: usize) -> bool {
    let Some(body) = fence_body(line) else {
        return false;
    };
    let run = body.bytes().take_while(|b| *b == ch).count();
    run >= len && body[run..].trim().is_empty()
}

fn scan_inline(text: &str, out: &mut Preprocessed) {
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut literal_start = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'`' => {
                let run = count_run(bytes, i, b'`');
                i = match find_closing_backticks(bytes, i + run, run) {
                    Some(close) => close + run,
                    None => i + run,
                };
            }
            b'$' | b'\\' => {
                if let Some((delim, close)) = match_delimiter(text, i) {
                    let end = close + delim.right.len();
                    let index = out.spans.len();
                    out.text.push_str(&text[literal_start..i]);
                    push_token(out, index);
                    out.spans.push(MathSpan {
                        source: text[i..end].to_string(),
                        tex: text[i + delim.left.len()..close].to_string(),
                        display: delim.display,
                    });
                    i = end;
                    literal_start = i;
                } else if text[i..].starts_with("$$") {
                    // Unterminated display math stays literal as a whole.
                    i += 2;
                } else if bytes[i] == b'\\' {
                    i += 1 + next_char_len(text, i + 1);
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    out.text.push_str(&text[literal_start..]);
}

fn push_token(out: &mut Preprocessed, index: usize) {
    out.text.push(TOKEN_OPEN);
    out.text.push_str(&index.to_string());
    out.text.push(TOKEN_CLOSE);
}

/// Try each delimiter in order at `start`, returning the first that closes.
fn match_delimiter(text: &str, start: usize) -> Option<(Delimiter, usize)> {
    let rest = &text[start..];
    for delim in DELIMITERS {
        if !rest.starts_with(delim.left) {
            continue;
        }
        // `$$` that doesn't close must not fall through to `$`.
        if delim.left == "$" && rest.starts_with("$$") {
            return None;
        }
        let content_start = start + delim.left.len();
        return find_closing(text, content_start, delim).map(|close| (delim, close));
    }
    None
}

/// Find the closing delimiter at brace depth zero, skipping escaped characters.
///
/// A code span starting inside the candidate wins over the formula.
fn find_closing(text: &str, from: usize, delim: Delimiter) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut j = from;
    while j < bytes.len() {
        if depth == 0 && bytes[j..].starts_with(delim.right.as_bytes()) {
            // Empty inline formulas are almost always prices or typos.
            return (j > from).then_some(j);
        }
        match bytes[j] {
            b'\\' => {
                j += 1 + next_char_len(text, j + 1);
                continue;
            }
            b'`' => {
                let run = count_run(bytes, j, b'`');
                if find_closing_backticks(bytes, j + run, run).is_some() {
                    return None;
                }
                j += run;
                continue;
            }
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'\n' if !delim.display && blank_line_follows(bytes, j + 1) => return None,
            _ => {}
        }
        j += 1;
    }
    None
}

/// Whether the line starting at `from` is blank (spaces, tabs, a CR).
fn blank_line_follows(bytes: &[u8], from: usize) -> bool {
    let rest = &bytes[from.min(bytes.len())..];
    let pad = rest
        .iter()
        .take_while(|b| matches!(b, b' ' | b'\t' | b'\r'))
        .count();
    rest.get(pad) == Some(&b'\n')
}

fn count_run(bytes: &[u8], start: usize, ch: u8) -> usize {
    bytes[start..].iter().take_while(|b| **b == ch).count()
}

fn find_closing_backticks(bytes: &[u8], from: usize, run: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        if bytes[j] == b'`' {
            let len = count_run(bytes, j, b'`');
            if len == run {
                return Some(j);
            }
            j += len;
        } else {
            j += 1;
        }
    }
    None
}

fn next_char_len(text: &str, at: usize) -> usize {
    text.get(at..)
        .and_then(|rest| rest.chars().next())
        .map_or(0, char::len_utf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tex_of(p: &Preprocessed) -> Vec<(&str, bool)> {
        p.spans.iter().map(|s| (s.tex.as_str(), s.display)).collect()
    }

    #[test]
    fn extracts_all_delimiter_kinds() {
        let p = extract_math(r"a $x$ b $$y$$ c \(z\) d \[w\]");
        assert_eq!(
            tex_of(&p),
            vec![("x", false), ("y", true), ("z", false), ("w", true)]
        );
        assert!(!p.text.contains('$'));
        assert!(!p.text.contains('\\'));
    }

    #[test]
    fn tokens_restore_to_source() {
        let src = r"Euler: $e^{i\pi} + 1 = 0$ and \[a_1 * b_2\]";
        let p = extract_math(src);
        assert_eq!(p.restore(&p.text), src);
    }

    #[test]
    fn skips_fenced_code() {
        let src = "```python\nprint('$x$')\n```\n\n$y$\n";
        let p = extract_math(src);
        assert_eq!(tex_of(&p), vec![("y", false)]);
        assert!(p.text.starts_with("```python\nprint('$x$')\n```\n"));
    }

    #[test]
    fn skips_inline_code() {
        let p = extract_math("`$a$` and $b$");
        assert_eq!(tex_of(&p), vec![("b", false)]);
        assert!(p.text.starts_with("`$a$` and "));
    }

    #[test]
    fn unterminated_display_math_stays_literal() {
        let p = extract_math("$$unterminated");
        assert!(p.spans.is_empty());
        assert_eq!(p.text, "$$unterminated");
    }

    #[test]
    fn escaped_dollar_is_not_a_delimiter() {
        let p = extract_math(r"costs \$5 and \$10");
        assert!(p.spans.is_empty());
    }

    #[test]
    fn closing_delimiter_respects_braces() {
        let p = extract_math(r"$\text{a $ b}$");
        assert_eq!(tex_of(&p), vec![(r"\text{a $ b}", false)]);
    }

    #[test]
    fn inline_math_does_not_cross_paragraphs() {
        let p = extract_math("$5 today\n\ntomorrow $6");
        assert!(p.spans.is_empty());
    }

    #[test]
    fn crlf_blank_line_ends_inline_math() {
        let p = extract_math("$5 today\r\n\r\ntomorrow $6");
        assert!(p.spans.is_empty());
        let p = extract_math("$5 today\n  \ntomorrow $6");
        assert!(p.spans.is_empty());
        let p = extract_math("$a +\r\nb$");
        assert_eq!(tex_of(&p), vec![("a +\r\nb", false)]);
    }

    #[test]
    fn code_span_inside_candidate_wins() {
        let src = "cost $a `b$` c";
        let p = extract_math(src);
        assert!(p.spans.is_empty());
        assert_eq!(p.text, src);

        // An unmatched backtick does not open a code span.
        let p = extract_math("$a ` b$");
        assert_eq!(tex_of(&p), vec![("a ` b", false)]);
    }

    #[test]
    fn doubled_backslash_delimiters() {
        let p = extract_math(r"a \\(x^2\\) b \\[y\\] c \(z\)");
        assert_eq!(tex_of(&p), vec![("x^2", false), ("y", true), ("z", false)]);
        assert_eq!(p.spans[0].source, r"\\(x^2\\)");
        assert_eq!(p.restore(&p.text), r"a \\(x^2\\) b \\[y\\] c \(z\)");
    }

    #[test]
    fn display_math_spans_lines() {
        let p = extract_math("$$\n\\sum_i x_i\n$$\n");
        assert_eq!(tex_of(&p), vec![("\n\\sum_i x_i\n", true)]);
    }

    #[test]
    fn stray_sentinels_are_neutralized() {
        let p = extract_math("\u{E000}0\u{E001} $x$");
        assert_eq!(p.spans.len(), 1);
        let segments = p.segments(&p.text);
        assert_eq!(segments[0], Segment::Text("\u{FFFD}0\u{FFFD} "));
        assert!(matches!(segments[1], Segment::Math(span) if span.tex == "x"));
    }

    #[test]
    fn segments_keep_unknown_tokens_as_text() {
        let p = Preprocessed::default();
        let segments = p.segments("a\u{E000}7\u{E001}b");
        let joined: String = segments
            .iter()
            .map(|s| match s {
                Segment::Text(t) => *t,
                Segment::Math(_) => "",
            })
            .collect();
        assert_eq!(joined, "a\u{E000}7\u{E001}b");
    }
}
