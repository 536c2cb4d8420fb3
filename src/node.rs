//! Parsed scenario nodes and the tokenizer seam.
//!
//! A scenario is an ordered sequence of [`ScriptNode`]s plus a label map.
//! Node positions are semantically meaningful: jump targets reference
//! indices, which is why patching has to report length deltas.

use std::fmt::Debug;
use std::mem::take;

use ahash::AHashMap;

/// One tagged unit of a parsed scenario: a text run, an inline `[tag]`
/// command, or a `*label` marker. `val` holds the raw source of the unit;
/// for text runs it is the displayable text itself.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptNode {
    pub tag: String,
    pub params: AHashMap<String, String>,
    pub val: String,
}

impl ScriptNode {
    pub fn text(val: impl Into<String>) -> Self {
        ScriptNode { tag: "text".to_string(), params: AHashMap::new(), val: val.into() }
    }

    pub fn label(name: &str, val: impl Into<String>) -> Self {
        let mut params = AHashMap::new();
        params.insert("label_name".to_string(), name.to_string());
        ScriptNode { tag: "label".to_string(), params, val: val.into() }
    }

    pub fn is_text(&self) -> bool {
        self.tag == "text"
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// One scenario's parsed node sequence plus its label map. The label map
/// must always resolve to positions in the *current* sequence; the
/// translation pass re-records label indices as it walks.
#[derive(Clone, Debug)]
pub struct Scenario {
    pub name: String,
    pub nodes: Vec<ScriptNode>,
    pub labels: AHashMap<String, usize>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, nodes: Vec<ScriptNode>) -> Self {
        let mut labels = AHashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            if node.tag == "label" {
                if let Some(label_name) = node.param("label_name") {
                    labels.insert(label_name.to_string(), index);
                }
            }
        }
        Scenario { name: name.into(), nodes, labels }
    }

    pub fn from_source(name: impl Into<String>, source: &str, parser: &dyn ScenarioParser) -> Self {
        Self::new(name, parser.parse(source))
    }

    pub fn label_index(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }
}

/// The host engine's tokenizer, used as a black box: both the live scenario
/// and ad-hoc re-parses of translation-table rows go through this. It must
/// be pure, and every node it produces must carry a stable `tag` the engine
/// core can pattern-match on.
pub trait ScenarioParser: Debug {
    fn parse(&self, text: &str) -> Vec<ScriptNode>;
}

pub(crate) fn is_tag_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Reference tokenizer for TyranoScript (KAG) fragments. Covers the subset
/// the translation core needs: text runs, inline `[tag key=value]` commands,
/// `@tag` command lines, `*label` lines, `;` comment lines, and a `\*`
/// escape for text that starts with a literal asterisk.
///
/// The `[r]` line-break marker is owned by the line wrapper, so it does not
/// become a node of its own: it terminates the current text run and stays
/// attached to that run's raw value. `a[r]b` parses to the two text nodes
/// `"a[r]"` and `"b"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct KagParser;

impl ScenarioParser for KagParser {
    fn parse(&self, text: &str) -> Vec<ScriptNode> {
        let mut nodes = Vec::new();
        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with(';') {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix('*') {
                let name_end =
                    rest.find(|c: char| c.is_whitespace() || c == '|').unwrap_or(rest.len());
                nodes.push(ScriptNode::label(&rest[..name_end], line));
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix('@') {
                if let Some(node) = Self::parse_command(rest, line) {
                    nodes.push(node);
                    continue;
                }
            }
            Self::parse_inline(line, &mut nodes);
        }
        nodes
    }
}

impl KagParser {
    fn parse_inline(line: &str, nodes: &mut Vec<ScriptNode>) {
        let mut buf = String::new();
        let mut rest = line;
        while let Some(pos) = rest.find('[') {
            buf.push_str(&rest[..pos]);
            match Self::parse_tag(&rest[pos..]) {
                Some((node, len)) => {
                    if node.tag == "r" {
                        buf.push_str(&rest[pos..pos + len]);
                        nodes.push(ScriptNode::text(take(&mut buf)));
                    } else {
                        if !buf.is_empty() {
                            nodes.push(ScriptNode::text(take(&mut buf)));
                        }
                        nodes.push(node);
                    }
                    rest = &rest[pos + len..];
                }
                None => {
                    // stray bracket, keep it as text
                    buf.push('[');
                    rest = &rest[pos + 1..];
                }
            }
        }
        buf.push_str(rest);
        if !buf.is_empty() {
            nodes.push(ScriptNode::text(buf));
        }
    }

    /// Parse one `[tag ...]` starting at the `[`. Returns the node and the
    /// byte length of the tag in the source, or None if this is not a
    /// well-formed tag.
    fn parse_tag(s: &str) -> Option<(ScriptNode, usize)> {
        let end = s.find(']')?;
        let body = &s[1..end];
        let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
        let name = &body[..name_end];
        // closing tags like [/ruby] keep the slash in their tag name
        let bare = name.strip_prefix('/').unwrap_or(name);
        if bare.is_empty() || !bare.chars().all(is_tag_name_char) {
            return None;
        }
        let node = ScriptNode {
            tag: name.to_string(),
            params: Self::parse_params(&body[name_end..]),
            val: s[..=end].to_string(),
        };
        Some((node, end + 1))
    }

    /// Parse an `@tag ...` command line. `rest` is the line after the `@`.
    fn parse_command(rest: &str, line: &str) -> Option<ScriptNode> {
        let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let name = &rest[..name_end];
        if name.is_empty() || !name.chars().all(is_tag_name_char) {
            return None;
        }
        Some(ScriptNode {
            tag: name.to_string(),
            params: Self::parse_params(&rest[name_end..]),
            val: line.to_string(),
        })
    }

    fn parse_params(mut rest: &str) -> AHashMap<String, String> {
        let mut params = AHashMap::new();
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            let key_end =
                rest.find(|c: char| c == '=' || c.is_whitespace()).unwrap_or(rest.len());
            let key = &rest[..key_end];
            rest = &rest[key_end..];
            if let Some(after_eq) = rest.strip_prefix('=') {
                let (value, after) = Self::parse_value(after_eq);
                params.insert(key.to_string(), value.to_string());
                rest = after;
            } else if !key.is_empty() {
                // bare flag parameter
                params.insert(key.to_string(), String::new());
            }
        }
        params
    }

    fn parse_value(s: &str) -> (&str, &str) {
        for quote in ['"', '\''] {
            if let Some(inner) = s.strip_prefix(quote) {
                if let Some(end) = inner.find(quote) {
                    return (&inner[..end], &inner[end + 1..]);
                }
                return (inner, "");
            }
        }
        let end = s.find(char::is_whitespace).unwrap_or(s.len());
        (&s[..end], &s[end..])
    }
}
