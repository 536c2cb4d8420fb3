//! Pixel-width line wrapping for translated text.
//!
//! The original engine measured text on a canvas; here the width is
//! estimated from `unicode-width` terminal columns scaled by half the font
//! pixel size. Not precise, but it keeps the property that matters: CJK
//! glyphs count double.

use unicode_width::UnicodeWidthStr;

/// The engine's explicit line-break marker. Once wrapping is applied, the
/// wrapper owns line breaks: markers already inside a wrapped line are
/// stripped from every non-final produced line.
pub const LINE_BREAK: &str = "[r]";

pub const DEFAULT_FONT_SIZE: u32 = 24;
pub const DEFAULT_EXTRA_SPACING: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WrapStyle {
    /// Maximum line width in pixels; 0 disables wrapping.
    pub max_width: u32,
    pub font_size: u32,
    /// Slack added to every measurement, in pixels.
    pub extra_spacing: u32,
}

impl Default for WrapStyle {
    fn default() -> Self {
        WrapStyle {
            max_width: 0,
            font_size: DEFAULT_FONT_SIZE,
            extra_spacing: DEFAULT_EXTRA_SPACING,
        }
    }
}

impl WrapStyle {
    fn measure(&self, text: &str) -> u32 {
        let columns = u32::try_from(UnicodeWidthStr::width(text)).unwrap_or(u32::MAX);
        columns * (self.font_size / 2) + self.extra_spacing
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303f}'   // punctuation
        | '\u{3040}'..='\u{309f}' // hiragana
        | '\u{30a0}'..='\u{30ff}' // katakana
        | '\u{3400}'..='\u{4dbf}' // CJK extension A
        | '\u{4e00}'..='\u{9faf}' // CJK unified
    )
}

fn strip_markers(line: &str) -> String {
    line.replace(LINE_BREAK, "").replace("[R]", "")
}

/// Re-flow `text` into width-constrained lines joined by [`LINE_BREAK`].
///
/// Paragraphs (explicit `\n`) are wrapped independently and empty paragraphs
/// stay as empty lines. Within a paragraph the wrappable unit is a
/// whitespace-delimited word, or a single character when the paragraph
/// contains CJK script. If everything fits on one line the input is
/// returned unchanged, pre-existing markers included.
pub fn wrap(text: &str, style: &WrapStyle) -> String {
    if style.max_width == 0 || text.is_empty() {
        return text.to_string();
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        if paragraph.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        wrap_paragraph(paragraph, style, &mut lines);
    }

    if lines.len() > 1 {
        let last = lines.len() - 1;
        for line in &mut lines[..last] {
            *line = strip_markers(line);
        }
        lines.join(LINE_BREAK)
    } else {
        text.to_string()
    }
}

fn wrap_paragraph(paragraph: &str, style: &WrapStyle, lines: &mut Vec<String>) {
    let cjk = paragraph.chars().any(is_cjk);
    let units: Vec<String> = if cjk {
        paragraph.chars().map(String::from).collect()
    } else {
        paragraph.split_whitespace().map(String::from).collect()
    };

    let mut current = String::new();
    let mut current_width = 0;
    for unit in units {
        let unit_width =
            if cjk { style.measure(&unit) } else { style.measure(&format!(" {unit}")) };
        if current_width + unit_width > style.max_width && !current.is_empty() {
            lines.push(current);
            current_width = style.measure(&unit);
            current = unit;
        } else if current.is_empty() {
            current_width = style.measure(&unit);
            current = unit;
        } else {
            if !cjk {
                current.push(' ');
            }
            current.push_str(&unit);
            current_width += unit_width;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
}
