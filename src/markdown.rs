//! Markdown rendering and front-matter extraction.
//!
//! The processor never touches markdown syntax itself. It calls a
//! [`MarkdownEngine`], which turns one source file into a [`Document`]:
//! the parsed front matter and the rendered HTML body.
//!
//! ## Default engine
//!
//! [`PulldownEngine`] is built on [pulldown-cmark](https://docs.rs/pulldown-cmark):
//!
//! - YAML front matter between `---` fences at the top of the file
//! - tables and strikethrough
//! - raw HTML passes through untouched
//! - soft line breaks render as `<br />` (hard wraps)
//! - headings get an `id` derived from their text, de-duplicated with
//!   `-1`, `-2`, ... suffixes; explicit `{#id}` attributes win
//! - fenced code blocks whose info string names a known language are
//!   highlighted with [syntect](https://docs.rs/syntect) using inline
//!   styles from the `InspiredGitHub` theme; anything else stays a plain
//!   `<pre><code>` block
//!
//! ```text
//! ---
//! title: Hello
//! slug: hello
//! ---
//!
//! # Hello World        →  <h1 id="hello-world">Hello World</h1>
//! ```

use crate::metadata::Metadata;
use crate::naming::anchor_id;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};
use std::collections::HashMap;
use std::sync::LazyLock;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use thiserror::Error;

const HIGHLIGHT_THEME: &str = "InspiredGitHub";

static HIGHLIGHTER: LazyLock<Highlighter> = LazyLock::new(|| Highlighter {
    syntaxes: SyntaxSet::load_defaults_newlines(),
    theme: ThemeSet::load_defaults().themes.remove(HIGHLIGHT_THEME),
});

#[derive(Error, Debug)]
pub enum MarkdownError {
    #[error("source is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invalid front matter: {0}")]
    FrontMatter(#[from] serde_yaml::Error),
    #[error("failed to highlight code block: {0}")]
    Highlight(#[from] syntect::Error),
}

/// A rendered markdown source.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub metadata: Metadata,
    pub html: String,
}

/// Renders markdown sources. Implementations must be shareable across
/// the processor's worker threads.
pub trait MarkdownEngine: Sync {
    fn render(&self, source: &[u8]) -> Result<Document, MarkdownError>;
}

/// pulldown-cmark backed engine.
#[derive(Debug, Clone)]
pub struct PulldownEngine {
    /// Render soft breaks as `<br />`.
    pub hard_wraps: bool,
    /// Derive `id` attributes for headings that have none.
    pub heading_ids: bool,
    /// Syntax-highlight fenced code blocks with a recognised language.
    pub highlight: bool,
}

impl Default for PulldownEngine {
    fn default() -> Self {
        Self {
            hard_wraps: true,
            heading_ids: true,
            highlight: true,
        }
    }
}

impl PulldownEngine {
    fn options(&self) -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
    }
}

impl MarkdownEngine for PulldownEngine {
    fn render(&self, source: &[u8]) -> Result<Document, MarkdownError> {
        let text = std::str::from_utf8(source)?;

        let mut front_matter = String::new();
        let mut in_front_matter = false;
        let mut events = Vec::new();
        let mut code: Option<(&SyntaxReference, &Theme, String)> = None;

        for event in Parser::new_ext(text, self.options()) {
            match event {
                Event::Start(Tag::MetadataBlock(_)) => in_front_matter = true,
                Event::End(TagEnd::MetadataBlock(_)) => in_front_matter = false,
                Event::Text(t) if in_front_matter => front_matter.push_str(&t),
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) if self.highlight => {
                    match HIGHLIGHTER.resolve(&info) {
                        Some((syntax, theme)) => code = Some((syntax, theme, String::new())),
                        None => events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info)))),
                    }
                }
                Event::Text(t) if code.is_some() => {
                    if let Some((_, _, buf)) = code.as_mut() {
                        buf.push_str(&t);
                    }
                }
                Event::End(TagEnd::CodeBlock) if code.is_some() => {
                    if let Some((syntax, theme, buf)) = code.take() {
                        let highlighted =
                            highlighted_html_for_string(&buf, &HIGHLIGHTER.syntaxes, syntax, theme)?;
                        events.push(Event::Html(highlighted.into()));
                    }
                }
                Event::SoftBreak if self.hard_wraps => events.push(Event::HardBreak),
                other => events.push(other),
            }
        }

        if self.heading_ids {
            assign_heading_ids(&mut events);
        }

        let mut body = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut body, events.into_iter());

        Ok(Document {
            metadata: parse_front_matter(&front_matter)?,
            html: body,
        })
    }
}

struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Option<Theme>,
}

impl Highlighter {
    /// The syntax named by the first word of a fence info string, e.g.
    /// `go` in ```` ```go title="main.go" ````.
    fn resolve(&self, info: &str) -> Option<(&SyntaxReference, &Theme)> {
        let theme = self.theme.as_ref()?;
        let token = info.split(|c: char| c.is_whitespace() || c == ',').next()?;
        if token.is_empty() {
            return None;
        }
        let syntax = self.syntaxes.find_syntax_by_token(token)?;
        Some((syntax, theme))
    }
}

fn parse_front_matter(yaml: &str) -> Result<Metadata, MarkdownError> {
    if yaml.trim().is_empty() {
        return Ok(Metadata::new());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Give every heading without an explicit id one derived from its text.
fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut seen: HashMap<String, usize> = HashMap::new();

    for i in 0..events.len() {
        let Event::Start(Tag::Heading { id: None, .. }) = &events[i] else {
            continue;
        };

        let text: String = events[i + 1..]
            .iter()
            .take_while(|e| !matches!(e, Event::End(TagEnd::Heading(_))))
            .filter_map(|e| match e {
                Event::Text(t) | Event::Code(t) => Some(t.as_ref()),
                _ => None,
            })
            .collect();

        let base = anchor_id(&text);
        if base.is_empty() {
            continue;
        }

        let count = seen.entry(base.clone()).or_insert(0);
        let unique = if *count == 0 {
            base
        } else {
            format!("{base}-{count}")
        };
        *count += 1;

        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(unique.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(source: &str) -> Document {
        PulldownEngine::default().render(source.as_bytes()).unwrap()
    }

    #[test]
    fn front_matter_is_parsed_and_stripped() {
        let doc = render("---\ntitle: Hello\nfeatured: true\n---\n\nBody text.\n");
        assert_eq!(doc.metadata["title"].as_str(), Some("Hello"));
        assert_eq!(doc.metadata["featured"].as_bool(), Some(true));
        assert!(!doc.html.contains("title: Hello"));
        assert!(doc.html.contains("<p>Body text.</p>"));
    }

    #[test]
    fn missing_front_matter_yields_empty_metadata() {
        let doc = render("Just a paragraph.\n");
        assert!(doc.metadata.is_empty());
        assert!(doc.html.contains("Just a paragraph."));
    }

    #[test]
    fn invalid_front_matter_is_an_error() {
        let err = PulldownEngine::default()
            .render(b"---\ntitle: [unclosed\n---\n\nBody\n")
            .unwrap_err();
        assert!(matches!(err, MarkdownError::FrontMatter(_)));
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let err = PulldownEngine::default().render(&[0xff, 0xfe, 0xfd]).unwrap_err();
        assert!(matches!(err, MarkdownError::Utf8(_)));
    }

    #[test]
    fn headings_get_ids() {
        let doc = render("# Hello World\n\n## Hello World\n");
        assert!(doc.html.contains(r#"<h1 id="hello-world">"#));
        assert!(doc.html.contains(r#"<h2 id="hello-world-1">"#));
    }

    #[test]
    fn explicit_heading_id_wins() {
        let doc = render("# Intro {#start}\n");
        assert!(doc.html.contains(r#"id="start""#));
    }

    #[test]
    fn soft_breaks_become_hard_breaks() {
        let doc = render("line one\nline two\n");
        assert!(doc.html.contains("<br />"));
    }

    #[test]
    fn soft_breaks_kept_when_disabled() {
        let engine = PulldownEngine {
            hard_wraps: false,
            heading_ids: false,
            highlight: false,
        };
        let doc = engine.render(b"# Title\n\nline one\nline two\n").unwrap();
        assert!(!doc.html.contains("<br />"));
        assert!(doc.html.contains("<h1>Title</h1>"));
    }

    #[test]
    fn tables_and_raw_html_render() {
        let doc = render("| a | b |\n|---|---|\n| 1 | 2 |\n\n<div class=\"note\">hi</div>\n");
        assert!(doc.html.contains("<table>"));
        assert!(doc.html.contains(r#"<div class="note">hi</div>"#));
    }

    #[test]
    fn fenced_code_is_highlighted() {
        let doc = render("```go\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n```\n");
        assert!(doc.html.contains("<pre style="));
        assert!(doc.html.contains("<span style="));
        assert!(doc.html.contains("Println"));
        assert!(!doc.html.contains("<br />"));
    }

    #[test]
    fn unknown_language_stays_plain() {
        let doc = render("```no-such-language
x = 1
```
");
        assert!(doc.html.contains(r#"<code class="language-no-such-language">"#));
        assert!(!doc.html.contains("<span style="));
    }

    #[test]
    fn highlighting_can_be_disabled() {
        let engine = PulldownEngine {
            highlight: false,
            ..PulldownEngine::default()
        };
        let doc = engine.render(b"```rust
fn main() {}
```
").unwrap();
        assert!(doc.html.contains(r#"<code class="language-rust">"#));
    }
}
