//! Token annotator — re-serializes an edited token stream into annotated markup.
//!
//! This is the inverse of [`crate::extract`]: every selected token becomes
//! one `<H>...</H>` span, with its trailing separator kept outside the span.

use serde::{Deserialize, Serialize};

use crate::document::escape_html;
use crate::error::{LockstepError, Result};
use crate::extract::{CLOSE, OPEN};

/// One token from the editing surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    #[serde(rename = "sep", default)]
    pub separator: String,
    #[serde(default)]
    pub selected: bool,
}

impl Token {
    pub fn new(text: impl Into<String>, separator: impl Into<String>, selected: bool) -> Self {
        Self {
            text: text.into(),
            separator: separator.into(),
            selected,
        }
    }
}

/// Half-open `[start, end)` range into the token stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct TokenRange {
    pub start: usize,
    pub end: usize,
}

impl From<[usize; 2]> for TokenRange {
    fn from([start, end]: [usize; 2]) -> Self {
        Self { start, end }
    }
}

impl From<TokenRange> for [usize; 2] {
    fn from(r: TokenRange) -> Self {
        [r.start, r.end]
    }
}

/// Block layout sent alongside the token stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlockSpec {
    #[serde(rename = "h3", alias = "heading")]
    Heading {
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "p", alias = "paragraph")]
    Paragraph {
        #[serde(default)]
        token_range: TokenRange,
    },
}

/// Serialize tokens and blocks into raw annotated markup.
///
/// Fails with [`LockstepError::InvalidTokenRange`] when a paragraph range
/// does not fit the token stream.
pub fn annotate(tokens: &[Token], blocks: &[BlockSpec]) -> Result<String> {
    let mut rendered = Vec::with_capacity(blocks.len());
    for block in blocks {
        match block {
            BlockSpec::Heading { text } => {
                rendered.push(format!("<h3>{}</h3>", escape_html(text)));
            }
            BlockSpec::Paragraph { token_range } => {
                let slice = token_slice(tokens, *token_range)?;
                rendered.push(format!("<p>{}</p>", render_tokens(slice)));
            }
        }
    }
    Ok(rendered.join("\n").trim().to_string())
}

fn token_slice(tokens: &[Token], range: TokenRange) -> Result<&[Token]> {
    let TokenRange { start, end } = range;
    if start > end || end > tokens.len() {
        return Err(LockstepError::InvalidTokenRange {
            start,
            end,
            len: tokens.len(),
        });
    }
    Ok(&tokens[start..end])
}

fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        let text = escape_html(&token.text);
        if token.selected {
            out.push_str(OPEN);
            out.push_str(&text);
            out.push_str(CLOSE);
        } else {
            out.push_str(&text);
        }
        out.push_str(&escape_html(&token.separator));
    }
    out
}
