//! Canonicalization of displayable text for matching against the
//! translation table. The normalized form is only ever a search key; the
//! un-normalized original is what gets replaced.

use crate::node::is_tag_name_char;

const ZERO_WIDTH_SPACE: char = '\u{200b}';

/// Normalize a text value: drop zero-width spaces, strip every inline
/// markup token of the form `[name ...]` (closing `[/name]` included), and
/// trim the ends. Idempotent.
pub fn normalize(text: &str) -> String {
    let cleaned: String =
        text.chars().filter(|&c| c != ZERO_WIDTH_SPACE).collect();
    let mut out = String::with_capacity(cleaned.len());
    let mut rest = cleaned.trim();
    while let Some(pos) = rest.find('[') {
        out.push_str(&rest[..pos]);
        match markup_len(&rest[pos..]) {
            Some(len) => rest = &rest[pos + len..],
            None => {
                out.push('[');
                rest = &rest[pos + 1..];
            }
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Byte length of the markup token starting at the `[`, or None if the
/// bracket does not open a well-formed token.
fn markup_len(s: &str) -> Option<usize> {
    let end = s.find(']')?;
    let body = &s[1..end];
    let body = body.strip_prefix('/').unwrap_or(body);
    let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let name = &body[..name_end];
    (!name.is_empty() && name.chars().all(is_tag_name_char)).then_some(end + 1)
}
