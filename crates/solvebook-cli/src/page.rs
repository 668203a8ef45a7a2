//! Standalone HTML page around a rendered fragment.

use pulldown_cmark_escape::escape_html;

/// Wrap `body` in a complete document with the stylesheet inlined.
pub fn standalone_page(title: &str, body: &str, css: &str) -> String {
    let mut escaped_title = String::with_capacity(title.len());
    // Writing into a String cannot fail.
    let _ = escape_html(&mut escaped_title, title);

    let mut page = String::with_capacity(body.len() + css.len() + 256);
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    page.push_str("<title>");
    page.push_str(&escaped_title);
    page.push_str("</title>\n<style>\n");
    page.push_str(css);
    page.push_str("</style>\n</head>\n<body>\n<main class=\"sb-preview\">\n");
    page.push_str(body);
    page.push_str("</main>\n</body>\n</html>\n");
    page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_escapes_title() {
        let page = standalone_page("a < b", "<p>x</p>\n", "body{}\n");
        insta::assert_snapshot!(page, @r#"
        <!DOCTYPE html>
        <html>
        <head>
        <meta charset="utf-8">
        <meta name="viewport" content="width=device-width, initial-scale=1">
        <title>a &lt; b</title>
        <style>
        body{}
        </style>
        </head>
        <body>
        <main class="sb-preview">
        <p>x</p>
        </main>
        </body>
        </html>
        "#);
    }
}
