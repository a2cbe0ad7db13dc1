//! Structure builder — classifies freshly imported plain text into headings
//! and paragraphs.
//!
//! The output never contains annotation delimiters: all text is escaped, so
//! an imported document has no targets until it is annotated.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::{Block, Document, escape_html};

/// Outline labels such as `I. `, `B. ` or `12. ` at the start of a line.
static OUTLINE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[IVX]+|[A-Z]|[0-9]+)\.\s").expect("outline label pattern is valid")
});

/// Build a document from plain text in one pass over its lines.
pub fn build_structure(plain_text: &str) -> Document {
    let mut blocks = Vec::new();
    let mut buf: Vec<&str> = Vec::new();

    for line in split_lines(plain_text).into_iter().map(str::trim) {
        if line.is_empty() {
            flush(&mut buf, &mut blocks);
            continue;
        }
        if is_heading(line) {
            flush(&mut buf, &mut blocks);
            blocks.push(Block::heading(escape_html(line.trim_end_matches(':'))));
        } else {
            buf.push(line);
        }
    }
    flush(&mut buf, &mut blocks);

    if blocks.is_empty() {
        blocks.push(Block::paragraph(escape_html(plain_text)));
    }
    Document::new(blocks)
}

/// Line boundaries: LF, CR, CRLF (one break), VT, FF, the ASCII file/group/record
/// separators, NEL, and the Unicode line and paragraph separators.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' && chars.next_if(|&(_, next)| next == '\n').is_some() {
            start += 1;
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn is_heading(line: &str) -> bool {
    line.ends_with(':') || OUTLINE_LABEL.is_match(line)
}

fn flush(buf: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if !buf.is_empty() {
        blocks.push(Block::paragraph(escape_html(&buf.join(" "))));
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carriage_return_lines() {
        let doc = build_structure("Overview:\rCells are\rthe basic unit.");
        assert_eq!(doc.to_markup(), "<h3>Overview</h3>\n<p>Cells are the basic unit.</p>");
    }

    #[test]
    fn test_form_feed_page_break_starts_new_line() {
        let doc = build_structure("page one text\x0cII. Next part");
        assert_eq!(doc.to_markup(), "<p>page one text</p>\n<h3>II. Next part</h3>");
    }

    #[test]
    fn test_crlf_is_a_single_break() {
        let doc = build_structure("Intro:\r\nfirst line\r\nsecond line\r\n\r\nnext para");
        assert_eq!(
            doc.to_markup(),
            "<h3>Intro</h3>\n<p>first line second line</p>\n<p>next para</p>"
        );
    }

    #[test]
    fn test_unicode_separators_split_lines() {
        assert_eq!(split_lines("a\u{2028}b\u{2029}c\u{85}d"), ["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\x1cb\x1dc\x1ed\x0be"), ["a", "b", "c", "d", "e"]);
        assert_eq!(split_lines("a\n\nb\n"), ["a", "", "b"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_roman_numeral_heading_keeps_label() {
        let doc = build_structure("I. Cell Theory");
        assert_eq!(doc.blocks, vec![Block::heading("I. Cell Theory")]);
    }

    #[test]
    fn test_colon_heading_strips_colon() {
        let doc = build_structure("Overview:");
        assert_eq!(doc.blocks, vec![Block::heading("Overview")]);
        assert_eq!(doc.to_markup(), "<h3>Overview</h3>");
    }

    #[test]
    fn test_consecutive_lines_join_into_one_paragraph() {
        let doc = build_structure("Cells are\nthe basic unit.");
        assert_eq!(doc.to_markup(), "<p>Cells are the basic unit.</p>");
    }

    #[test]
    fn test_blank_line_separates_paragraphs() {
        let doc = build_structure("  first line  \n\n\nsecond line\n");
        assert_eq!(doc.to_markup(), "<p>first line</p>\n<p>second line</p>");
    }

    #[test]
    fn test_heading_flushes_pending_paragraph() {
        let text = "Intro text\nmore intro\nA. Organelles\nThe nucleus\n2. Energy\nATP:";
        let doc = build_structure(text);
        assert_eq!(
            doc.to_markup(),
            "<p>Intro text more intro</p>\n<h3>A. Organelles</h3>\n<p>The nucleus</p>\n<h3>2. Energy</h3>\n<h3>ATP</h3>"
        );
    }

    #[test]
    fn test_label_requires_following_whitespace() {
        let doc = build_structure("3.14 is pi\nAB. not a label\nI.e. nothing");
        assert_eq!(doc.blocks.len(), 1);
        assert!(matches!(doc.blocks[0], Block::Paragraph { .. }));
    }

    #[test]
    fn test_text_is_escaped() {
        let doc = build_structure("a <H>b</H> & c\nx < y:");
        assert_eq!(doc.to_markup(), "<p>a &lt;H&gt;b&lt;/H&gt; &amp; c</p>\n<h3>x &lt; y</h3>");
        assert!(crate::extract::extract(&doc.to_markup()).targets.is_empty());
    }

    #[test]
    fn test_empty_input_falls_back_to_single_paragraph() {
        assert_eq!(build_structure("").to_markup(), "<p></p>");
        assert_eq!(build_structure(" \n\t\n").to_markup(), "<p> \n\t\n</p>");
    }
}
