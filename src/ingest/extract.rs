//! Extract collaborators turning a raw page into passages.
//!
//! Both stock extractors reduce a page to a stream of [`Element`]s and fold
//! it with [`fold_passages`], so HTML and Markdown pages share the same
//! title/subtitle scoping rules.

use std::fmt::Debug;

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use regex::{Captures, Regex};

use crate::document::passage::{Element, Passage, fold_passages};
use crate::error::{DocseekError, Result};

/// Turns raw page content into passages.
pub trait Extractor: Send + Sync + Debug {
    /// Extract the passages of `raw`, in page order.
    fn extract(&self, raw: &str) -> Result<Vec<Passage>>;

    /// Name of this extractor.
    fn name(&self) -> &'static str;
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| DocseekError::invalid_argument(format!("Invalid regex pattern: {e}")))
}

/// Extracts `h1`, `h2` and `p` elements from HTML.
///
/// `h1` opens a title, `h2` a subtitle and every `p` becomes a passage. Tags
/// nested inside an element are stripped and the basic named and numeric
/// character references are decoded. `script`, `style` and comment blocks are
/// skipped.
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    ignored: Regex,
    open: Regex,
    close: [Regex; 3],
    tag: Regex,
    entity: Regex,
    whitespace: Regex,
}

const BLOCK_TAGS: [&str; 3] = ["h1", "h2", "p"];

impl HtmlExtractor {
    pub fn new() -> Result<Self> {
        Ok(HtmlExtractor {
            ignored: compile(
                r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>",
            )?,
            open: compile(r"(?i)<(h1|h2|p)(?:\s[^>]*)?>")?,
            close: [
                compile(r"(?i)</h1\s*>")?,
                compile(r"(?i)</h2\s*>")?,
                compile(r"(?i)</p\s*>")?,
            ],
            tag: compile(r"<[^>]*>")?,
            entity: compile(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);")?,
            whitespace: compile(r"\s+")?,
        })
    }

    /// The element stream of `html`.
    pub fn elements(&self, html: &str) -> Vec<Element> {
        let html = self.ignored.replace_all(html, " ");
        let mut elements = Vec::new();
        let mut cursor = 0;

        while let Some(caps) = self.open.captures_at(&html, cursor) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            let kind = name.as_str().to_ascii_lowercase();
            let Some(index) = BLOCK_TAGS.iter().position(|tag| *tag == kind) else {
                break;
            };

            let start = whole.end();
            // An unclosed element runs until the next block element.
            let (end, next) = match self.close[index].find_at(&html, start) {
                Some(close) => (close.start(), close.end()),
                None => {
                    let end = self
                        .open
                        .find_at(&html, start)
                        .map_or(html.len(), |m| m.start());
                    (end, end)
                }
            };

            let text = self.text_of(&html[start..end]);
            elements.push(match index {
                0 => Element::Title(text),
                1 => Element::Subtitle(text),
                _ => Element::Paragraph(text),
            });
            cursor = next;
        }

        elements
    }

    fn text_of(&self, fragment: &str) -> String {
        let stripped = self.tag.replace_all(fragment, " ");
        let decoded = self
            .entity
            .replace_all(&stripped, |caps: &Captures| decode_entity(caps));
        self.whitespace.replace_all(decoded.trim(), " ").into_owned()
    }
}

fn decode_entity(caps: &Captures) -> String {
    let name = &caps[1];
    let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse().ok().and_then(char::from_u32)
    } else {
        match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => None,
        }
    };

    match decoded {
        Some(c) => c.to_string(),
        None => caps[0].to_string(),
    }
}

impl Extractor for HtmlExtractor {
    fn extract(&self, raw: &str) -> Result<Vec<Passage>> {
        Ok(fold_passages(self.elements(raw)))
    }

    fn name(&self) -> &'static str {
        "html"
    }
}

/// Extracts passages from Markdown.
///
/// Level 1 headings (ATX or setext) are titles and level 2 headings are
/// subtitles. Deeper headings end the current block without opening a
/// section. Paragraphs, list items and code blocks each become one passage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownExtractor;

fn flush_block(text: &mut String, elements: &mut Vec<Element>) {
    let block = collapse_whitespace(&std::mem::take(text));
    if !block.is_empty() {
        elements.push(Element::Paragraph(block));
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl MarkdownExtractor {
    pub fn new() -> Self {
        MarkdownExtractor
    }

    /// The element stream of `markdown`.
    pub fn elements(&self, markdown: &str) -> Vec<Element> {
        let mut elements = Vec::new();
        let mut text = String::new();

        for event in Parser::new(markdown) {
            match event {
                Event::Start(
                    Tag::Heading { .. } | Tag::Paragraph | Tag::CodeBlock(_) | Tag::Item,
                ) => flush_block(&mut text, &mut elements),
                Event::End(TagEnd::Heading(level)) => {
                    let heading = collapse_whitespace(&std::mem::take(&mut text));
                    match level {
                        HeadingLevel::H1 => elements.push(Element::Title(heading)),
                        HeadingLevel::H2 => elements.push(Element::Subtitle(heading)),
                        _ => {}
                    }
                }
                Event::End(TagEnd::Paragraph | TagEnd::CodeBlock | TagEnd::Item) => {
                    flush_block(&mut text, &mut elements)
                }
                Event::Text(chunk) | Event::Code(chunk) => text.push_str(&chunk),
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                _ => {}
            }
        }
        flush_block(&mut text, &mut elements);

        elements
    }
}

impl Extractor for MarkdownExtractor {
    fn extract(&self, raw: &str) -> Result<Vec<Passage>> {
        Ok(fold_passages(self.elements(raw)))
    }

    fn name(&self) -> &'static str {
        "markdown"
    }
}

/// Picks the HTML extractor for content starting with `<`, Markdown otherwise.
#[derive(Debug, Clone)]
pub struct AutoExtractor {
    html: HtmlExtractor,
    markdown: MarkdownExtractor,
}

impl AutoExtractor {
    pub fn new() -> Result<Self> {
        Ok(AutoExtractor {
            html: HtmlExtractor::new()?,
            markdown: MarkdownExtractor,
        })
    }
}

impl Extractor for AutoExtractor {
    fn extract(&self, raw: &str) -> Result<Vec<Passage>> {
        if raw.trim_start().starts_with('<') {
            self.html.extract(raw)
        } else {
            self.markdown.extract(raw)
        }
    }

    fn name(&self) -> &'static str {
        "auto"
    }
}
