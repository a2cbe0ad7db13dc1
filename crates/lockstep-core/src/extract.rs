//! Target extraction — turns annotated markup into rendered markup plus an
//! ordered target list.
//!
//! The scanner walks the input once with two states, outside and inside an
//! annotation. Malformed delimiters are never fatal:
//!
//! - an opener inside an open span makes the earlier opener literal text and
//!   starts the span at the new opener, so the innermost span wins;
//! - an opener still open at end of input is emitted literally;
//! - a closer outside a span is emitted literally.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{Target, highlight_span};

/// Opening annotation delimiter.
pub const OPEN: &str = "<H>";
/// Closing annotation delimiter.
pub const CLOSE: &str = "</H>";

/// Result of scanning one piece of annotated markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub rendered: String,
    pub targets: Vec<Target>,
    /// Delimiters that could not be paired and were kept as literal text.
    pub literal_delimiters: usize,
}

/// Scan `raw` for `<H>...</H>` spans, assigning ids `t1, t2, ...` in order.
pub fn extract(raw: &str) -> Extraction {
    let mut rendered = String::with_capacity(raw.len() + raw.len() / 4);
    let mut targets = Vec::new();
    let mut literal_delimiters = 0;

    // Byte offset of the opener of the span we are inside, if any.
    let mut open: Option<usize> = None;
    let mut pos = 0;

    while let Some(rel) = raw[pos..].find('<') {
        let at = pos + rel;
        if open.is_none() {
            rendered.push_str(&raw[pos..at]);
        }
        let tail = &raw[at..];

        if tail.starts_with(OPEN) {
            if let Some(prev) = open.replace(at) {
                rendered.push_str(&raw[prev..at]);
                literal_delimiters += 1;
            }
            pos = at + OPEN.len();
        } else if tail.starts_with(CLOSE) {
            match open.take() {
                Some(start) => {
                    let target = Target::at(targets.len(), &raw[start + OPEN.len()..at]);
                    rendered.push_str(&highlight_span(&target));
                    targets.push(target);
                }
                None => {
                    rendered.push_str(CLOSE);
                    literal_delimiters += 1;
                }
            }
            pos = at + CLOSE.len();
        } else {
            if open.is_none() {
                rendered.push('<');
            }
            pos = at + 1;
        }
    }

    match open {
        Some(start) => {
            rendered.push_str(&raw[start..]);
            literal_delimiters += 1;
        }
        None => rendered.push_str(&raw[pos..]),
    }

    if literal_delimiters > 0 {
        debug!(literal_delimiters, "Unpaired annotation delimiters kept as text");
    }
    debug!(targets = targets.len(), "Extracted targets");

    Extraction {
        rendered,
        targets,
        literal_delimiters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, text: &str) -> String {
        format!(r#"<span class="target need-highlight" data-target-id="{id}">{text}</span>"#)
    }

    #[test]
    fn test_no_delimiters_returns_input_unchanged() {
        let raw = "<h3>Intro</h3>\n<p>No targets <b>here</b> &amp; there.</p>";
        let ex = extract(raw);
        assert_eq!(ex.rendered, raw);
        assert!(ex.targets.is_empty());
        assert_eq!(ex.literal_delimiters, 0);
    }

    #[test]
    fn test_targets_in_document_order() {
        let raw = "<h3>Cells</h3>\n<p>The <H>nucleus</H> and <H>cell membrane</H>.</p>\n<p><H>ATP</H></p>";
        let ex = extract(raw);

        let ids: Vec<&str> = ex.targets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["t1", "t2", "t3"]);
        assert_eq!(ex.targets[1].text, "cell membrane");
        assert_eq!(
            ex.rendered,
            format!(
                "<h3>Cells</h3>\n<p>The {} and {}.</p>\n<p>{}</p>",
                span("t1", "nucleus"),
                span("t2", "cell membrane"),
                span("t3", "ATP")
            )
        );
    }

    #[test]
    fn test_inner_text_is_not_reescaped() {
        let ex = extract("<p><H>a &lt; b</H></p>");
        assert_eq!(ex.targets[0].text, "a &lt; b");
        assert!(ex.rendered.contains(">a &lt; b</span>"));
    }

    #[test]
    fn test_ids_are_stable_across_runs() {
        let raw = "<p><H>one</H> <H>two</H> <H>three</H></p>";
        assert_eq!(extract(raw), extract(raw));
    }

    #[test]
    fn test_spans_may_cross_lines() {
        let ex = extract("<p><H>split\nacross</H></p>");
        assert_eq!(ex.targets[0].text, "split\nacross");
    }

    #[test]
    fn test_adjacent_spans_are_distinct_targets() {
        let ex = extract("<H>a</H><H>b</H>");
        assert_eq!(ex.targets.len(), 2);
        assert_eq!(ex.rendered, format!("{}{}", span("t1", "a"), span("t2", "b")));
    }

    #[test]
    fn test_empty_span_is_a_target() {
        let ex = extract("x<H></H>y");
        assert_eq!(ex.targets, vec![Target::at(0, "")]);
        assert_eq!(ex.rendered, format!("x{}y", span("t1", "")));
    }

    #[test]
    fn test_nested_opener_innermost_wins() {
        let ex = extract("<H>outer <H>inner</H> tail</H>");
        assert_eq!(ex.targets, vec![Target::at(0, "inner")]);
        assert_eq!(ex.rendered, format!("<H>outer {} tail</H>", span("t1", "inner")));
        assert_eq!(ex.literal_delimiters, 2);
    }

    #[test]
    fn test_unclosed_opener_is_literal() {
        let ex = extract("<p><H>done</H> and <H>dangling</p>");
        assert_eq!(ex.targets.len(), 1);
        assert_eq!(ex.rendered, format!("<p>{} and <H>dangling</p>", span("t1", "done")));
        assert_eq!(ex.literal_delimiters, 1);
    }

    #[test]
    fn test_stray_closer_is_literal() {
        let ex = extract("a</H>b<H>c</H>");
        assert_eq!(ex.targets, vec![Target::at(0, "c")]);
        assert_eq!(ex.rendered, format!("a</H>b{}", span("t1", "c")));
    }

    #[test]
    fn test_other_tags_pass_through() {
        let ex = extract("<Hx>not</Hx> <h>lower</h> <H>yes</H>");
        assert_eq!(ex.targets.len(), 1);
        assert!(ex.rendered.starts_with("<Hx>not</Hx> <h>lower</h> "));
    }

    #[test]
    fn test_multibyte_text_is_preserved() {
        let ex = extract("细胞 <H>细胞核</H> — ok");
        assert_eq!(ex.targets[0].text, "细胞核");
        assert!(ex.rendered.starts_with("细胞 <span"));
        assert!(ex.rendered.ends_with("</span> — ok"));
    }
}
