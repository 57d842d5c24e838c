//! Markdown rendering service
//!
//! Converts mentor biographies and post bodies to HTML with pulldown-cmark.
//! Raw HTML in the source is escaped rather than passed through, and links
//! with script schemes are neutralized, so rendered output is safe to embed
//! in pages without a separate sanitizer.
//!
//! # Example
//!
//! ```
//! use hr_companion::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let html = renderer.render("# Hello World\n\nThis is **bold** text.");
//! assert!(html.contains("<h1>"));
//! assert!(html.contains("<strong>"));
//! ```

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

/// Link schemes replaced by `#` in rendered output
const BLOCKED_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Stateless Markdown renderer.
///
/// Supports headings, lists, links, images, blockquotes, fenced code,
/// emphasis, strikethrough, tables, task lists and smart punctuation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options
    }

    /// Render Markdown text to HTML.
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, Self::options()).map(|event| match event {
            // Raw HTML is shown as text
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Link {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            }),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Image {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            }),
            other => other,
        });

        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, parser);
        html_output
    }

    /// Plain-text summary of at most `max_chars` characters, used for post
    /// excerpts and page descriptions.
    pub fn excerpt(&self, markdown: &str, max_chars: usize) -> String {
        let mut text = String::new();
        for event in Parser::new_ext(markdown, Self::options()) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                Event::End(
                    TagEnd::Paragraph
                    | TagEnd::Heading(_)
                    | TagEnd::Item
                    | TagEnd::CodeBlock
                    | TagEnd::BlockQuote
                    | TagEnd::TableCell,
                ) => {
                    if !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
                _ => {}
            }
        }

        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() <= max_chars {
            return collapsed;
        }

        let truncated: String = collapsed.chars().take(max_chars).collect();
        // Cut at the last word boundary when there is one
        let cut = match truncated.rfind(' ') {
            Some(idx) if idx > 0 => &truncated[..idx],
            _ => truncated.as_str(),
        };
        format!("{}…", cut.trim_end())
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let lowered = url.trim().to_ascii_lowercase();
    if BLOCKED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_heading() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Heading 1");
        assert!(html.contains("<h1>"));
        assert!(html.contains("Heading 1"));
        assert!(html.contains("</h1>"));
    }

    #[test]
    fn test_render_emphasis() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("This is **bold**, *italic* and ~~gone~~.");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_render_lists() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("- Item 1\n- Item 2\n\n1. First\n2. Second");
        assert!(html.contains("<ul>"));
        assert!(html.contains("<ol>"));
        assert!(html.contains("<li>Item 2</li>"));
    }

    #[test]
    fn test_render_link() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("[Profile](https://example.com/ana)");
        assert!(html.contains("<a href=\"https://example.com/ana\">Profile</a>"));
    }

    #[test]
    fn test_render_table() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("| Skill | Years |\n|-------|-------|\n| Hiring | 5 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<th>Skill</th>"));
        assert!(html.contains("<td>Hiring</td>"));
    }

    #[test]
    fn test_fenced_code_keeps_language_class() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```rust\nfn main() {}\n```");
        assert!(html.contains("<pre><code class=\"language-rust\">"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("<script>alert(1)</script>\n\nHi <b>there</b>");
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_script_links_are_neutralized() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("[click](javascript:alert(1)) ![x](JavaScript:void)");
        assert!(!html.to_lowercase().contains("javascript:"));
        assert!(html.contains("href=\"#\""));
    }

    #[test]
    fn test_excerpt_strips_markup() {
        let renderer = MarkdownRenderer::new();
        let text = renderer.excerpt("# Title\n\nSome **bold** words.", 100);
        assert_eq!(text, "Title Some bold words.");
    }

    #[test]
    fn test_excerpt_truncates_on_word_boundary() {
        let renderer = MarkdownRenderer::new();
        let text = renderer.excerpt("one two three four", 9);
        assert_eq!(text, "one two…");
        assert_eq!(renderer.excerpt("", 10), "");
    }
}
