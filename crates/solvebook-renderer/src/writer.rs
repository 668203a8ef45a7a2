//! HTML writer for the preview pipeline.
//!
//! Walks pulldown-cmark events and writes sanitized HTML, swapping the math
//! tokens left by [`crate::preprocess`] for typeset MathML.

use std::collections::HashMap;

use pulldown_cmark::{
    Alignment, BlockQuoteKind, CodeBlockKind, CowStr, Event, LinkType, Tag, TagEnd,
};
use pulldown_cmark_escape::{StrWrite, escape_href, escape_html, escape_html_body_text};
#[cfg(feature = "syntax-highlighting")]
use syntect::parsing::SyntaxSet;

use crate::error::RenderWarning;
use crate::math::{MathResult, Typesetter};
use crate::options::RenderOptions;
use crate::preprocess::{Preprocessed, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableState {
    Head,
    Body,
}

/// Write a code block without highlighting.
pub fn write_plain_block<W: StrWrite>(
    mut writer: W,
    lang: Option<&str>,
    code: &str,
) -> Result<(), W::Error> {
    match lang.filter(|l| !l.is_empty()) {
        Some(lang) => {
            writer.write_str(r#"<pre class="sb-code"><code class="language-"#)?;
            escape_html(&mut writer, lang)?;
            writer.write_str(r#"">"#)?;
        }
        None => writer.write_str(r#"<pre class="sb-code"><code>"#)?,
    }
    escape_html_body_text(&mut writer, code)?;
    writer.write_str("</code></pre>\n")
}

/// Neutralize URL schemes that can run script.
///
/// `data:` is allowed only for images, and only for `data:image/`.
pub fn safe_url(url: &str, image: bool) -> &str {
    // Browsers ignore whitespace and control characters inside the scheme.
    let scheme: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    let blocked = ["javascript:", "vbscript:", "file:"]
        .iter()
        .any(|s| scheme.starts_with(s))
        || (scheme.starts_with("data:") && !(image && scheme.starts_with("data:image/")));
    if blocked {
        tracing::debug!(url, "neutralized unsafe url");
        "#"
    } else {
        url
    }
}

pub struct HtmlWriter<'a, 'input, I: Iterator<Item = Event<'input>>, W: StrWrite> {
    iter: I,
    writer: W,
    options: &'a RenderOptions,
    math: &'a Preprocessed,
    #[cfg(feature = "syntax-highlighting")]
    syntax_set: Option<&'a SyntaxSet>,

    /// Whether or not the last write wrote a newline.
    end_newline: bool,

    table_state: TableState,
    table_alignments: Vec<Alignment>,
    table_cell_index: usize,
    numbers: HashMap<CowStr<'input>, usize>,

    code_buffer: Option<(Option<String>, String)>, // (lang, content)
    typesetter: Typesetter,

    warnings: Vec<RenderWarning>,
}

impl<'a, 'input, I: Iterator<Item = Event<'input>>, W: StrWrite> HtmlWriter<'a, 'input, I, W> {
    pub fn new(iter: I, writer: W, options: &'a RenderOptions, math: &'a Preprocessed) -> Self {
        Self {
            iter,
            writer,
            options,
            math,
            #[cfg(feature = "syntax-highlighting")]
            syntax_set: None,
            end_newline: true,
            table_state: TableState::Head,
            table_alignments: vec![],
            table_cell_index: 0,
            numbers: HashMap::new(),
            code_buffer: None,
            typesetter: Typesetter::new(),
            warnings: Vec::new(),
        }
    }

    #[cfg(feature = "syntax-highlighting")]
    pub fn with_syntax_set(mut self, syntax_set: &'a SyntaxSet) -> Self {
        self.syntax_set = Some(syntax_set);
        self
    }

    /// Write every event, returning the warnings collected on the way.
    pub fn run(mut self) -> Result<Vec<RenderWarning>, W::Error> {
        while let Some(event) = self.iter.next() {
            self.process_event(event)?;
        }
        Ok(self.warnings)
    }

    /// Writes a new line.
    #[inline]
    fn write_newline(&mut self) -> Result<(), W::Error> {
        self.end_newline = true;
        self.writer.write_str("\n")
    }

    /// Writes a buffer, and tracks whether or not a newline was written.
    #[inline]
    fn write(&mut self, s: &str) -> Result<(), W::Error> {
        self.writer.write_str(s)?;

        if !s.is_empty() {
            self.end_newline = s.ends_with('\n');
        }
        Ok(())
    }

    /// Start a block element on a fresh line.
    fn write_block_open(&mut self, s: &str) -> Result<(), W::Error> {
        if !self.end_newline {
            self.write_newline()?;
        }
        self.write(s)
    }

    fn process_event(&mut self, event: Event<'input>) -> Result<(), W::Error> {
        match event {
            Event::Start(tag) => self.start_tag(tag)?,
            Event::End(tag) => self.end_tag(tag)?,
            Event::Text(text) => {
                if let Some((_, ref mut buffer)) = self.code_buffer {
                    buffer.push_str(&text);
                } else {
                    self.write_text(&text)?;
                }
            }
            Event::Code(text) => {
                self.write("<code>")?;
                escape_html_body_text(&mut self.writer, &self.math.restore(&text))?;
                self.write("</code>")?;
            }
            Event::InlineMath(tex) => self.write_formula(&tex, &tex, false)?,
            Event::DisplayMath(tex) => self.write_formula(&tex, &tex, true)?,
            Event::Html(html) | Event::InlineHtml(html) => {
                let html = self.math.restore(&html);
                if self.options.allow_raw_html {
                    self.write(&html)?;
                } else {
                    escape_html_body_text(&mut self.writer, &html)?;
                    self.end_newline = html.ends_with('\n');
                }
            }
            Event::SoftBreak => {
                if self.options.hard_breaks {
                    self.write("<br />\n")?;
                } else {
                    self.write_newline()?;
                }
            }
            Event::HardBreak => self.write("<br />\n")?,
            Event::Rule => self.write_block_open("<hr />\n")?,
            Event::FootnoteReference(name) => {
                let number = self.footnote_number(name.clone());
                self.write("<sup class=\"footnote-reference\"><a href=\"#")?;
                escape_html(&mut self.writer, &name)?;
                self.write("\">")?;
                write!(&mut self.writer, "{}", number)?;
                self.write("</a></sup>")?;
            }
            Event::TaskListMarker(true) => {
                self.write("<input disabled=\"\" type=\"checkbox\" checked=\"\"/>\n")?;
            }
            Event::TaskListMarker(false) => {
                self.write("<input disabled=\"\" type=\"checkbox\"/>\n")?;
            }
        }
        Ok(())
    }

    fn footnote_number(&mut self, name: CowStr<'input>) -> usize {
        let len = self.numbers.len() + 1;
        *self.numbers.entry(name).or_insert(len)
    }

    /// Escape prose, typesetting any math tokens it carries.
    fn write_text(&mut self, text: &str) -> Result<(), W::Error> {
        let math = self.math;
        for segment in math.segments(text) {
            match segment {
                Segment::Text(t) => {
                    escape_html_body_text(&mut self.writer, t)?;
                    if !t.is_empty() {
                        self.end_newline = t.ends_with('\n');
                    }
                }
                Segment::Math(span) => self.write_formula(&span.tex, &span.source, span.display)?,
            }
        }
        Ok(())
    }

    fn write_formula(&mut self, tex: &str, source: &str, display: bool) -> Result<(), W::Error> {
        match self.typesetter.typeset(tex, display) {
            MathResult::Success(html) => self.write(&html),
            MathResult::Error { html, message } => {
                tracing::warn!(tex, error = %message, "formula failed to typeset");
                self.warnings.push(RenderWarning::Math {
                    source: source.to_string(),
                    message,
                });
                self.write(&html)
            }
        }
    }

    fn write_code_block(&mut self, lang: Option<String>, code: &str) -> Result<(), W::Error> {
        let code = self.math.restore(code);
        if self.options.highlight {
            if let Some(html) = self.highlighted(lang.as_deref(), &code) {
                return self.write(&html);
            }
        }
        write_plain_block(&mut self.writer, lang.as_deref(), &code)?;
        self.end_newline = true;
        Ok(())
    }

    #[cfg(feature = "syntax-highlighting")]
    fn highlighted(&mut self, lang: Option<&str>, code: &str) -> Option<String> {
        let syntax_set = self.syntax_set?;
        let mut out = String::new();
        match crate::code_pretty::highlight(syntax_set, lang, code, &mut out) {
            Ok(_) => Some(out),
            Err(err) => {
                tracing::warn!(?lang, error = %err, "highlighting failed, writing plain block");
                self.warnings.push(RenderWarning::Highlight {
                    lang: lang.map(smol_str::SmolStr::new),
                    message: err.to_string(),
                });
                None
            }
        }
    }

    #[cfg(not(feature = "syntax-highlighting"))]
    fn highlighted(&mut self, _lang: Option<&str>, _code: &str) -> Option<String> {
        None
    }

    /// Writes the start of an HTML tag.
    fn start_tag(&mut self, tag: Tag<'input>) -> Result<(), W::Error> {
        match tag {
            // Escaped block HTML still needs a container.
            Tag::HtmlBlock if !self.options.allow_raw_html => self.write_block_open("<p>"),
            Tag::HtmlBlock => Ok(()),
            Tag::Paragraph => self.write_block_open("<p>"),
            Tag::Heading {
                level,
                id,
                classes,
                attrs: _,
            } => {
                self.write_block_open("<")?;
                write!(&mut self.writer, "{}", level)?;
                if let Some(id) = id {
                    self.write(" id=\"")?;
                    escape_html(&mut self.writer, &id)?;
                    self.write("\"")?;
                }
                let mut classes = classes.iter();
                if let Some(class) = classes.next() {
                    self.write(" class=\"")?;
                    escape_html(&mut self.writer, class)?;
                    for class in classes {
                        self.write(" ")?;
                        escape_html(&mut self.writer, class)?;
                    }
                    self.write("\"")?;
                }
                self.write(">")
            }
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                self.write_block_open("<table>")
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                self.write("<thead><tr>")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                self.write("<tr>")
            }
            Tag::TableCell => {
                match self.table_state {
                    TableState::Head => self.write("<th")?,
                    TableState::Body => self.write("<td")?,
                }
                match self.table_alignments.get(self.table_cell_index) {
                    Some(&Alignment::Left) => self.write(" style=\"text-align: left\">"),
                    Some(&Alignment::Center) => self.write(" style=\"text-align: center\">"),
                    Some(&Alignment::Right) => self.write(" style=\"text-align: right\">"),
                    _ => self.write(">"),
                }
            }
            Tag::BlockQuote(kind) => {
                let class_str = match kind {
                    None => "",
                    Some(BlockQuoteKind::Note) => " class=\"markdown-alert-note\"",
                    Some(BlockQuoteKind::Tip) => " class=\"markdown-alert-tip\"",
                    Some(BlockQuoteKind::Important) => " class=\"markdown-alert-important\"",
                    Some(BlockQuoteKind::Warning) => " class=\"markdown-alert-warning\"",
                    Some(BlockQuoteKind::Caution) => " class=\"markdown-alert-caution\"",
                };
                self.write_block_open(&format!("<blockquote{}>\n", class_str))
            }
            Tag::CodeBlock(info) => {
                if !self.end_newline {
                    self.write_newline()?;
                }
                let lang = match info {
                    CodeBlockKind::Fenced(info) => info
                        .split([' ', ',', '{'])
                        .next()
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code_buffer = Some((lang, String::new()));
                Ok(())
            }
            Tag::List(Some(1)) => self.write_block_open("<ol>\n"),
            Tag::List(Some(start)) => {
                self.write_block_open("<ol start=\"")?;
                write!(&mut self.writer, "{}", start)?;
                self.write("\">\n")
            }
            Tag::List(None) => self.write_block_open("<ul>\n"),
            Tag::Item => self.write_block_open("<li>"),
            Tag::Emphasis => self.write("<em>"),
            Tag::Strong => self.write("<strong>"),
            Tag::Strikethrough => self.write("<del>"),
            Tag::Superscript => self.write("<sup>"),
            Tag::Subscript => self.write("<sub>"),
            Tag::Link {
                link_type: LinkType::Email,
                dest_url,
                title,
                id: _,
            } => {
                self.write("<a href=\"mailto:")?;
                escape_href(&mut self.writer, &self.math.restore(&dest_url))?;
                self.write_title(&title)?;
                self.write("\">")
            }
            Tag::Link {
                link_type: _,
                dest_url,
                title,
                id: _,
            } => {
                let url = self.math.restore(&dest_url);
                self.write("<a href=\"")?;
                escape_href(&mut self.writer, safe_url(&url, false))?;
                self.write_title(&title)?;
                self.write("\">")
            }
            Tag::Image {
                link_type: _,
                dest_url,
                title,
                id: _,
            } => {
                let url = self.math.restore(&dest_url);
                self.write("<img src=\"")?;
                escape_href(&mut self.writer, safe_url(&url, true))?;
                self.write("\" alt=\"")?;
                self.raw_text()?;
                self.write_title(&title)?;
                self.write("\" />")
            }
            Tag::FootnoteDefinition(name) => {
                self.write_block_open("<div class=\"footnote-definition\" id=\"")?;
                escape_html(&mut self.writer, &name)?;
                self.write("\"><sup class=\"footnote-definition-label\">")?;
                let number = self.footnote_number(name);
                write!(&mut self.writer, "{}", number)?;
                self.write("</sup>")
            }
            // Extensions that are never enabled.
            _ => Ok(()),
        }
    }

    fn write_title(&mut self, title: &str) -> Result<(), W::Error> {
        if !title.is_empty() {
            self.write("\" title=\"")?;
            escape_html(&mut self.writer, &self.math.restore(title))?;
        }
        Ok(())
    }

    fn end_tag(&mut self, tag: TagEnd) -> Result<(), W::Error> {
        match tag {
            TagEnd::HtmlBlock if !self.options.allow_raw_html => self.write("</p>\n")?,
            TagEnd::Paragraph => self.write("</p>\n")?,
            TagEnd::Heading(level) => {
                self.write("</")?;
                write!(&mut self.writer, "{}", level)?;
                self.write(">\n")?;
            }
            TagEnd::Table => self.write("</tbody></table>\n")?,
            TagEnd::TableHead => {
                self.write("</tr></thead><tbody>\n")?;
                self.table_state = TableState::Body;
            }
            TagEnd::TableRow => self.write("</tr>\n")?,
            TagEnd::TableCell => {
                match self.table_state {
                    TableState::Head => self.write("</th>")?,
                    TableState::Body => self.write("</td>")?,
                }
                self.table_cell_index += 1;
            }
            TagEnd::BlockQuote(_) => self.write("</blockquote>\n")?,
            TagEnd::CodeBlock => {
                if let Some((lang, buffer)) = self.code_buffer.take() {
                    self.write_code_block(lang, &buffer)?;
                }
            }
            TagEnd::List(true) => self.write("</ol>\n")?,
            TagEnd::List(false) => self.write("</ul>\n")?,
            TagEnd::Item => self.write("</li>\n")?,
            TagEnd::Emphasis => self.write("</em>")?,
            TagEnd::Strong => self.write("</strong>")?,
            TagEnd::Strikethrough => self.write("</del>")?,
            TagEnd::Superscript => self.write("</sup>")?,
            TagEnd::Subscript => self.write("</sub>")?,
            TagEnd::Link => self.write("</a>")?,
            TagEnd::FootnoteDefinition => self.write("</div>\n")?,
            // Images are closed by `raw_text`.
            _ => {}
        }
        Ok(())
    }

    // run raw text, consuming end tag
    fn raw_text(&mut self) -> Result<(), W::Error> {
        let mut nest = 0;
        while let Some(event) = self.iter.next() {
            match event {
                Event::Start(_) => nest += 1,
                Event::End(_) => {
                    if nest == 0 {
                        break;
                    }
                    nest -= 1;
                }
                Event::Html(_) => {}
                Event::InlineHtml(text) | Event::Code(text) | Event::Text(text) => {
                    // The output of this function is used in the `alt` attribute.
                    let text = self.math.restore(&text);
                    escape_html(&mut self.writer, &text)?;
                    self.end_newline = text.ends_with('\n');
                }
                Event::InlineMath(text) => {
                    self.write("$")?;
                    escape_html(&mut self.writer, &text)?;
                    self.write("$")?;
                }
                Event::DisplayMath(text) => {
                    self.write("$$")?;
                    escape_html(&mut self.writer, &text)?;
                    self.write("$$")?;
                }
                Event::SoftBreak | Event::HardBreak | Event::Rule => {
                    self.write(" ")?;
                }
                Event::FootnoteReference(name) => {
                    let number = self.footnote_number(name);
                    write!(&mut self.writer, "[{}]", number)?;
                }
                Event::TaskListMarker(true) => self.write("[x]")?,
                Event::TaskListMarker(false) => self.write("[ ]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::extract_math;
    use pulldown_cmark::Parser;

    fn write_html(source: &str, options: &RenderOptions) -> String {
        let math = if options.math {
            extract_math(source)
        } else {
            Preprocessed {
                text: source.to_string(),
                spans: Vec::new(),
            }
        };
        let parser = Parser::new_ext(&math.text, options.md_options());
        let mut html = String::new();
        HtmlWriter::new(parser, &mut html, options, &math)
            .run()
            .unwrap();
        html
    }

    fn plain() -> RenderOptions {
        RenderOptions {
            highlight: false,
            ..Default::default()
        }
    }

    #[test]
    fn paragraph_with_soft_break() {
        insta::assert_snapshot!(write_html("one\ntwo", &plain()), @r"
        <p>one<br />
        two</p>
        ");
    }

    #[test]
    fn soft_break_without_hard_breaks() {
        let options = RenderOptions {
            hard_breaks: false,
            ..plain()
        };
        assert_eq!(write_html("one\ntwo", &options), "<p>one\ntwo</p>\n");
    }

    #[test]
    fn table_with_alignment() {
        insta::assert_snapshot!(write_html("| a | b |\n|:--|--:|\n| 1 | 2 |\n", &plain()), @r#"
        <table><thead><tr><th style="text-align: left">a</th><th style="text-align: right">b</th></tr></thead><tbody>
        <tr><td style="text-align: left">1</td><td style="text-align: right">2</td></tr>
        </tbody></table>
        "#);
    }

    #[test]
    fn task_list_and_strikethrough() {
        let html = write_html("- [x] done\n- [ ] ~~todo~~\n", &plain());
        assert!(html.contains(r#"<input disabled="" type="checkbox" checked=""/>"#));
        assert!(html.contains("<del>todo</del>"));
    }

    #[test]
    fn plain_code_block_is_escaped() {
        assert_eq!(
            write_html("```\n<b>&\n```\n", &plain()),
            "<pre class=\"sb-code\"><code>&lt;b&gt;&amp;\n</code></pre>\n"
        );
    }

    #[test]
    fn math_in_code_is_left_alone() {
        let html = write_html("`$x$`\n\n    $y$\n", &plain());
        assert!(html.contains("<code>$x$</code>"));
        assert!(html.contains("$y$"));
        assert!(!html.contains("<math"));
    }

    #[test]
    fn inline_math_is_typeset() {
        let html = write_html("area $a_1 * b_2$ here", &plain());
        assert!(html.contains("<math"));
        assert!(!html.contains("<em>"));
        assert!(html.starts_with("<p>area "));
    }

    #[test]
    fn bad_formula_is_contained() {
        let math = extract_math(r"ok $\notacommand{x}$ fine");
        let parser = Parser::new_ext(&math.text, plain().md_options());
        let mut html = String::new();
        let warnings = HtmlWriter::new(parser, &mut html, &plain(), &math)
            .run()
            .unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(&warnings[0], RenderWarning::Math { source, .. } if source == r"$\notacommand{x}$"));
        assert!(html.contains("math-error"));
        assert!(html.ends_with("fine</p>\n"));
    }

    #[test]
    fn raw_html_is_escaped_by_default() {
        let html = write_html("<script>alert(1)</script>\n", &plain());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn raw_html_passes_when_allowed() {
        let options = RenderOptions {
            allow_raw_html: true,
            ..plain()
        };
        let html = write_html("hi <kbd>x</kbd>", &options);
        assert!(html.contains("<kbd>x</kbd>"));
    }

    #[test]
    fn unsafe_links_are_neutralized() {
        let html = write_html("[x](javascript:alert(1)) ![y](data:text/html,hi)", &plain());
        assert!(html.contains(r##"<a href="#">x</a>"##));
        assert!(html.contains(r##"<img src="#" alt="y" />"##));
    }

    #[test]
    fn image_alt_restores_math_source() {
        let html = write_html("![area $x^2$](pic.png)", &plain());
        assert_eq!(html, "<p><img src=\"pic.png\" alt=\"area $x^2$\" /></p>\n");
    }

    #[test]
    fn safe_url_rules() {
        assert_eq!(safe_url("https://example.com", false), "https://example.com");
        assert_eq!(safe_url(" JavaScript:alert(1)", false), "#");
        assert_eq!(safe_url("java\tscript:x", false), "#");
        assert_eq!(safe_url("data:image/png;base64,AA", true), "data:image/png;base64,AA");
        assert_eq!(safe_url("data:image/png;base64,AA", false), "#");
        assert_eq!(safe_url("/relative/path", false), "/relative/path");
    }

    #[test]
    fn footnotes_are_numbered() {
        let options = RenderOptions {
            footnotes: true,
            ..plain()
        };
        let html = write_html("a[^n] b[^m]\n\n[^n]: first\n[^m]: second\n", &options);
        assert!(html.contains(r##"<a href="#n">1</a>"##));
        assert!(html.contains(r##"<a href="#m">2</a>"##));
        assert!(html.contains(r#"<div class="footnote-definition" id="n">"#));
    }

    #[cfg(feature = "syntax-highlighting")]
    #[test]
    fn highlighted_block_uses_classes() {
        let ss = SyntaxSet::load_defaults_newlines();
        let math = extract_math("```rust\nfn main() {}\n```\n");
        let parser = Parser::new_ext(&math.text, RenderOptions::default().md_options());
        let mut html = String::new();
        let options = RenderOptions::default();
        HtmlWriter::new(parser, &mut html, &options, &math)
            .with_syntax_set(&ss)
            .run()
            .unwrap();
        assert!(html.starts_with(r#"<pre class="sb-code"><code class="language-rust">"#));
        assert!(html.contains("<span class=\"sb-"));
    }
}
