//! Rewriting the live node sequence with a matched translation entry.
//!
//! Both sides of the entry are re-parsed into fragment sequences and
//! compared structurally. When the shapes line up, text values are
//! overwritten in place; otherwise the affected node run is spliced out and
//! replaced, and the caller learns the length delta so it can repair any
//! index bookkeeping.

use crate::node::{ScenarioParser, ScriptNode};
use crate::table::TranslationEntry;
use crate::wrap::{wrap, WrapStyle};

/// Structural verdict on the original vs. translated fragment sequences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchShape {
    /// Same length, same tag at every position: text values can be
    /// overwritten on the live sequence without moving nodes.
    SameShape,
    /// The sequences differ; a splice is required.
    Reshape,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchOutcome {
    /// First node index after the patched region; the scan resumes here.
    pub resume: usize,
    /// Node count change caused by the patch.
    pub delta: isize,
}

/// A translated line that starts with `*` would re-parse as a label, so the
/// asterisk is escaped before parsing and restored on the parsed fragments.
fn escape_leading_star(text: &str) -> String {
    let trimmed = text.trim_start();
    match trimmed.strip_prefix('*') {
        Some(rest) => format!("\\*{rest}"),
        None => text.to_string(),
    }
}

fn unescape_leading_star(fragment: &mut ScriptNode) {
    if let Some(rest) = fragment.val.strip_prefix("\\*") {
        fragment.val = format!("*{rest}");
    }
}

/// Patch `nodes` at `index` (a text node) with `entry`, wrapping the
/// translated text first. Returns where to resume the scan and the length
/// delta of the sequence.
pub fn apply_translation(
    nodes: &mut Vec<ScriptNode>,
    index: usize,
    entry: &TranslationEntry,
    parser: &dyn ScenarioParser,
    style: &WrapStyle,
) -> PatchOutcome {
    let old_fragments = parser.parse(&entry.original);
    let mut new_fragments = parser.parse(&escape_leading_star(&entry.translated));

    let mut shape = if old_fragments.len() == new_fragments.len() {
        PatchShape::SameShape
    } else {
        PatchShape::Reshape
    };

    let mut i = 0;
    while i < new_fragments.len() {
        if shape == PatchShape::SameShape && old_fragments[i].tag != new_fragments[i].tag {
            shape = PatchShape::Reshape;
        }
        if !new_fragments[i].is_text() {
            i += 1;
            continue;
        }
        // Wrapping can turn one text fragment into several, so the wrapped
        // text is re-parsed and the result spliced into the fragment list.
        let reparsed: Vec<ScriptNode> = parser
            .parse(&wrap(&new_fragments[i].val, style))
            .into_iter()
            .map(|mut fragment| {
                if fragment.is_text() {
                    unescape_leading_star(&mut fragment);
                }
                fragment
            })
            .collect();
        if reparsed.len() != 1 {
            shape = PatchShape::Reshape;
        }
        // no increment when the re-parse produced nothing: the next
        // fragment has shifted into position i
        let advance = reparsed.len();
        new_fragments.splice(i..=i, reparsed);
        i += advance;
    }

    // Align on the first text fragment of the original parse: the matched
    // node may sit mid-line, after markup that produced its own nodes.
    let old_text_start =
        old_fragments.iter().position(ScriptNode::is_text).unwrap_or(0);
    let start = index.saturating_sub(old_text_start).min(nodes.len());

    if shape == PatchShape::SameShape {
        for (offset, fragment) in new_fragments.iter().enumerate() {
            if fragment.is_text() {
                if let Some(node) = nodes.get_mut(start + offset) {
                    node.val = fragment.val.clone();
                }
            }
        }
        return PatchOutcome { resume: start + new_fragments.len(), delta: 0 };
    }

    let to_remove = old_fragments.len().max(1);
    let end = (start + to_remove).min(nodes.len());
    let removed = end - start;
    let inserted = new_fragments.len();
    nodes.splice(start..end, new_fragments);

    #[allow(clippy::cast_possible_wrap)]
    PatchOutcome { resume: start + inserted, delta: inserted as isize - removed as isize }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::KagParser;

    fn entry(original: &str, translated: &str) -> TranslationEntry {
        TranslationEntry::new(original, translated)
    }

    #[test]
    fn test_same_shape_overwrites_in_place() {
        let mut nodes = KagParser.parse("*start\nこんにちは\n*end\n");
        let outcome = apply_translation(
            &mut nodes,
            1,
            &entry("こんにちは", "Hello"),
            &KagParser,
            &WrapStyle::default(),
        );
        assert_eq!(outcome, PatchOutcome { resume: 2, delta: 0 });
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1], ScriptNode::text("Hello"));
    }

    #[test]
    fn test_wrap_splices_extra_nodes() {
        let style = WrapStyle { max_width: 60, ..WrapStyle::default() };
        let mut nodes = KagParser.parse("before\nこんにちは\nafter\n");
        let outcome = apply_translation(
            &mut nodes,
            1,
            &entry("こんにちは", "aaaa bbbb cccc"),
            &KagParser,
            &style,
        );
        // wrapped into three lines: one node becomes three
        assert_eq!(outcome, PatchOutcome { resume: 4, delta: 2 });
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[1], ScriptNode::text("aaaa[r]"));
        assert_eq!(nodes[2], ScriptNode::text("bbbb[r]"));
        assert_eq!(nodes[3], ScriptNode::text("cccc"));
        assert_eq!(nodes[4], ScriptNode::text("after"));
    }

    #[test]
    fn test_shape_change_splices() {
        // the translation drops the ruby annotation: 3 fragments become 1
        let mut nodes = KagParser.parse("x\naaa[ruby text=f]bbb\ny\n");
        assert_eq!(nodes.len(), 5);
        let outcome = apply_translation(
            &mut nodes,
            1,
            &entry("aaa[ruby text=f]bbb", "plain"),
            &KagParser,
            &WrapStyle::default(),
        );
        assert_eq!(outcome, PatchOutcome { resume: 2, delta: -2 });
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1], ScriptNode::text("plain"));
        assert_eq!(nodes[2], ScriptNode::text("y"));
    }

    #[test]
    fn test_alignment_on_mid_line_fragment() {
        // the matched node is the second text fragment of its original line
        let mut nodes = KagParser.parse("aaa[ruby text=f]bbb\n");
        assert_eq!(nodes.len(), 3);
        let outcome = apply_translation(
            &mut nodes,
            0,
            &entry("aaa[ruby text=f]bbb", "AAA[ruby text=f]BBB"),
            &KagParser,
            &WrapStyle::default(),
        );
        assert_eq!(outcome, PatchOutcome { resume: 3, delta: 0 });
        assert_eq!(nodes[0], ScriptNode::text("AAA"));
        assert_eq!(nodes[1].tag, "ruby");
        assert_eq!(nodes[2], ScriptNode::text("BBB"));
    }

    #[test]
    fn test_alignment_when_markup_leads_the_line() {
        // the original line opens with markup, so the matched text node
        // sits one position after the line's first node
        let mut nodes = KagParser.parse("[wait time=200]abc\n");
        assert_eq!(nodes.len(), 2);
        let outcome = apply_translation(
            &mut nodes,
            1,
            &entry("[wait time=200]abc", "[wait time=200]xyz"),
            &KagParser,
            &WrapStyle::default(),
        );
        assert_eq!(outcome, PatchOutcome { resume: 2, delta: 0 });
        assert_eq!(nodes[0].tag, "wait");
        assert_eq!(nodes[1], ScriptNode::text("xyz"));
    }

    #[test]
    fn test_leading_star_survives() {
        let mut nodes = vec![ScriptNode::text("choice")];
        let outcome = apply_translation(
            &mut nodes,
            0,
            &entry("choice", "*translated choice"),
            &KagParser,
            &WrapStyle::default(),
        );
        assert_eq!(outcome.delta, 0);
        assert_eq!(nodes[0], ScriptNode::text("*translated choice"));
    }

    #[test]
    fn test_empty_original_parse_still_splices() {
        // an original that parses to nothing degrades to a one-node splice
        let mut nodes = vec![ScriptNode::text(";odd"), ScriptNode::text("next")];
        let outcome = apply_translation(
            &mut nodes,
            0,
            &entry(";only a comment", "real text"),
            &KagParser,
            &WrapStyle::default(),
        );
        assert_eq!(outcome, PatchOutcome { resume: 1, delta: 0 });
        assert_eq!(nodes[0], ScriptNode::text("real text"));
        assert_eq!(nodes[1], ScriptNode::text("next"));
    }
}
