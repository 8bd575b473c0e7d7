//! CommonMark rendering engine backed by pulldown-cmark.

use pulldown_cmark::{html, Options, Parser};

use crate::MarkdownRender;

/// [`MarkdownRender`] using CommonMark with tables and strikethrough.
///
/// Output consisting of a single paragraph is unwrapped so list items and
/// headings render inline.
#[derive(Debug, Clone, Copy)]
pub struct CmarkRenderer {
    options: Options,
}

impl Default for CmarkRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl CmarkRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        Self { options }
    }

    /// Render without unwrapping the outer paragraph.
    pub fn render_block(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

impl MarkdownRender for CmarkRenderer {
    fn render(&self, markdown: &str) -> String {
        let block = self.render_block(markdown);
        unwrap_single_paragraph(&block)
            .unwrap_or(block.as_str())
            .to_string()
    }
}

fn unwrap_single_paragraph(html: &str) -> Option<&str> {
    let inner = html.strip_prefix("<p>")?.strip_suffix("</p>\n")?;
    if inner.contains("<p>") {
        return None;
    }
    Some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(md: &str) -> String {
        CmarkRenderer::new().render(md)
    }

    #[test]
    fn single_paragraph_is_unwrapped() {
        assert_eq!(
            render("[Helix](https://helix-editor.com) - *modal* editor."),
            r#"<a href="https://helix-editor.com">Helix</a> - <em>modal</em> editor."#
        );
    }

    #[test]
    fn multiple_blocks_stay_wrapped() {
        let html = render("first\n\nsecond");
        assert_eq!(html, "<p>first</p>\n<p>second</p>\n");
    }

    #[test]
    fn empty_input_renders_empty() {
        assert_eq!(render(""), "");
    }

    #[test]
    fn strikethrough_is_enabled() {
        assert_eq!(render("~~gone~~ kept"), "<del>gone</del> kept");
    }

    #[test]
    fn html_special_chars_are_escaped() {
        assert_eq!(render("a & b < c"), "a &amp; b &lt; c");
    }

    #[test]
    fn block_form_keeps_paragraph() {
        assert_eq!(CmarkRenderer::new().render_block("x"), "<p>x</p>\n");
    }
}
