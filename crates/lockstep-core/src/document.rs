//! Document model — blocks of headings and paragraphs, and the targets inside them.
//!
//! All text held by the model is already HTML-safe markup. Producers
//! ([`crate::structure`], [`crate::annotate`]) escape on the way in, so
//! rendering is plain concatenation.

use serde::{Deserialize, Serialize};

/// Prefix of every target id; ids run `t1`, `t2`, ... in document order.
pub const TARGET_ID_PREFIX: &str = "t";

/// First sequence number handed out to a target.
pub const TARGET_ID_ORIGIN: usize = 1;

/// A focus point inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub text: String,
}

impl Target {
    /// Build the target at zero-based position `index` in document order.
    pub fn at(index: usize, text: impl Into<String>) -> Self {
        Self {
            id: target_id(index),
            text: text.into(),
        }
    }
}

/// Id of the target at zero-based position `index`.
pub fn target_id(index: usize) -> String {
    format!("{TARGET_ID_PREFIX}{}", index + TARGET_ID_ORIGIN)
}

/// Inline content of a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Inline {
    Text(String),
    Target(Target),
}

/// A top-level block of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { text: String },
    Paragraph { inlines: Vec<Inline> },
}

impl Block {
    /// A paragraph holding a single run of (already escaped) text.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph {
            inlines: vec![Inline::Text(text.into())],
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self::Heading { text: text.into() }
    }

    pub fn to_markup(&self) -> String {
        match self {
            Block::Heading { text } => format!("<h3>{text}</h3>"),
            Block::Paragraph { inlines } => {
                let mut out = String::from("<p>");
                for inline in inlines {
                    match inline {
                        Inline::Text(text) => out.push_str(text),
                        Inline::Target(target) => out.push_str(&highlight_span(target)),
                    }
                }
                out.push_str("</p>");
                out
            }
        }
    }
}

/// An immutable sequence of blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Targets in strict document order.
    pub fn targets(&self) -> Vec<&Target> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph { inlines } => Some(inlines),
                Block::Heading { .. } => None,
            })
            .flatten()
            .filter_map(|i| match i {
                Inline::Target(t) => Some(t),
                Inline::Text(_) => None,
            })
            .collect()
    }

    /// Render blocks one per line.
    pub fn to_markup(&self) -> String {
        self.blocks
            .iter()
            .map(Block::to_markup)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Wrapper that replaces an annotation in rendered output.
pub fn highlight_span(target: &Target) -> String {
    format!(
        r#"<span class="target need-highlight" data-target-id="{}">{}</span>"#,
        target.id, target.text
    )
}

/// Escape `&`, `<` and `>` so text can be embedded in markup.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_target_ids_start_at_t1() {
        assert_eq!(target_id(0), "t1");
        assert_eq!(target_id(9), "t10");
    }

    #[test]
    fn test_document_markup_and_targets() {
        let doc = Document::new(vec![
            Block::heading("Overview"),
            Block::Paragraph {
                inlines: vec![
                    Inline::Text("Cells have a ".into()),
                    Inline::Target(Target::at(0, "nucleus")),
                    Inline::Text(".".into()),
                ],
            },
        ]);

        assert_eq!(
            doc.to_markup(),
            "<h3>Overview</h3>\n<p>Cells have a <span class=\"target need-highlight\" data-target-id=\"t1\">nucleus</span>.</p>"
        );
        let targets = doc.targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, "t1");
    }
}
