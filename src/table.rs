//! Decoder and encoder for the translation-table format.
//!
//! The format is line-based: one entry per row, fields separated by `→`.
//! `¶` escapes the next special character, so translators can put literal
//! separators and line breaks inside a field; `¶¶` is a literal `¶`.

use ahash::AHashMap;

pub const FIELD_SEPARATOR: char = '→';
pub const FIELD_ESCAPE: char = '¶';
const UTF8_BOM: char = '\u{feff}';
const COMMENT_PREFIX: &str = "//";

/// One row of a translation table. The `original` text is the identity key;
/// row order is only a locality hint for the locator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationEntry {
    pub original: String,
    pub translated: String,
}

impl TranslationEntry {
    pub fn new(original: impl Into<String>, translated: impl Into<String>) -> Self {
        TranslationEntry { original: original.into(), translated: translated.into() }
    }
}

fn split_rows(content: &str) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = vec![vec![String::new()]];
    let mut escaped = false;
    let mut prev = '\0';

    for c in content.chars() {
        if c == UTF8_BOM {
            continue;
        }
        if c == FIELD_ESCAPE {
            if escaped && prev == FIELD_ESCAPE {
                push_char(&mut rows, c);
            }
            escaped = !escaped;
        } else if c == FIELD_SEPARATOR && !escaped {
            push_field(&mut rows);
        } else if c == '\n' && !escaped {
            if prev == '\r' {
                pop_char(&mut rows);
            }
            rows.push(vec![String::new()]);
        } else {
            push_char(&mut rows, c);
            escaped = false;
        }
        prev = c;
    }
    rows
}

fn push_char(rows: &mut [Vec<String>], c: char) {
    if let Some(field) = rows.last_mut().and_then(|row| row.last_mut()) {
        field.push(c);
    }
}

fn pop_char(rows: &mut [Vec<String>]) {
    if let Some(field) = rows.last_mut().and_then(|row| row.last_mut()) {
        field.pop();
    }
}

fn push_field(rows: &mut [Vec<String>]) {
    if let Some(row) = rows.last_mut() {
        row.push(String::new());
    }
}

/// A row survives decoding if it has at least two fields, a non-empty first
/// field, and is not a comment. A `//` prefix on the first field marks a
/// comment row, unless the second field is also `//`-prefixed; that is the
/// escape hatch for translations that genuinely start with `//`.
fn keep_row(row: &[String]) -> bool {
    row.len() >= 2
        && !row[0].is_empty()
        && !(row[0].starts_with(COMMENT_PREFIX) && !row[1].starts_with(COMMENT_PREFIX))
}

/// Decode a translation table, preserving row order.
pub fn decode_rows(content: &str) -> Vec<TranslationEntry> {
    split_rows(content)
        .into_iter()
        .filter(|row| keep_row(row))
        .map(|mut row| {
            let translated = row.swap_remove(1);
            let original = row.swap_remove(0);
            TranslationEntry { original, translated }
        })
        .collect()
}

/// Decode a translation table into a dictionary of its first two fields.
/// Later rows overwrite earlier ones on key collision.
pub fn decode_dict(content: &str) -> AHashMap<String, String> {
    let mut dict = AHashMap::new();
    for mut row in split_rows(content) {
        if keep_row(&row) {
            let translated = row.swap_remove(1);
            let original = row.swap_remove(0);
            dict.insert(original, translated);
        }
    }
    dict
}

fn escape_field(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == FIELD_ESCAPE || c == FIELD_SEPARATOR || c == '\n' {
            out.push(FIELD_ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Encode entries in the table format, with a leading byte-order marker the
/// way the extraction tooling writes them. `decode_rows` inverts this.
pub fn encode_rows(entries: &[TranslationEntry]) -> String {
    let mut out = String::new();
    out.push(UTF8_BOM);
    for entry in entries {
        out.push_str(&escape_field(&entry.original));
        out.push(FIELD_SEPARATOR);
        out.push_str(&escape_field(&entry.translated));
        out.push('\n');
    }
    out
}
