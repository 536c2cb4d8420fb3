//! Pointer-based fuzzy search of a normalized text against a translation
//! table. Rows are usually emitted in document order, so a pointer plus
//! small forward/backward windows resolves the common case cheaply; the
//! decomposed and full-table stages trade cost for completeness when markup
//! reshapes the node stream or localization reorders rows.

use ahash::AHashSet;

use crate::node::ScenarioParser;
use crate::normalize::normalize;
use crate::table::TranslationEntry;

/// How far the forward and backward scans reach from the pointer.
pub const MAX_DISTANCE: usize = 15;

/// Find the table index whose entry matches `normalized`, or None.
///
/// Search order, first hit wins (a deliberate tie-break, not incidental):
/// pointer hit, forward scan, decomposed scan of markup-bearing originals,
/// backward scan, then a full-table fallback outside the scanned window.
pub fn find_translation(
    normalized: &str,
    table: &[TranslationEntry],
    pointer: usize,
    parser: &dyn ScenarioParser,
) -> Option<usize> {
    let matches = |index: usize| normalize(&table[index].original) == normalized;

    if pointer < table.len() && matches(pointer) {
        return Some(pointer);
    }

    for index in pointer + 1..=pointer + MAX_DISTANCE {
        if index >= table.len() {
            break;
        }
        if matches(index) {
            return Some(index);
        }
    }

    // Partial matches: the node under test may be a sub-segment of a
    // multi-part original line, e.g. text interrupted by a ruby annotation.
    for (index, entry) in table.iter().enumerate() {
        if !entry.original.contains('[') {
            continue;
        }
        for fragment in parser.parse(&entry.original) {
            if fragment.is_text() && normalize(&fragment.val) == normalized {
                return Some(index);
            }
        }
    }

    for back in 1..=MAX_DISTANCE {
        let Some(index) = pointer.checked_sub(back) else {
            break;
        };
        if index < table.len() && matches(index) {
            return Some(index);
        }
    }

    for index in 0..table.len() {
        if index + MAX_DISTANCE >= pointer && index <= pointer + MAX_DISTANCE {
            continue;
        }
        if matches(index) {
            return Some(index);
        }
    }

    None
}

/// The set of every normalized original in the table, including the text
/// sub-fragments of markup-bearing originals. Built once per pass so the
/// orchestrator gets O(1) "is this string translatable at all" checks.
pub fn original_strings_set(
    table: &[TranslationEntry],
    parser: &dyn ScenarioParser,
) -> AHashSet<String> {
    let mut set = AHashSet::new();
    for entry in table {
        set.insert(normalize(&entry.original));
        if entry.original.contains('[') {
            for fragment in parser.parse(&entry.original) {
                if fragment.is_text() {
                    let text = normalize(&fragment.val);
                    if !text.is_empty() {
                        set.insert(text);
                    }
                }
            }
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::KagParser;

    fn table(originals: &[&str]) -> Vec<TranslationEntry> {
        originals.iter().map(|o| TranslationEntry::new(*o, "x")).collect()
    }

    #[test]
    fn test_pointer_hit_wins() {
        // entry 0 decomposes to a fragment that also matches "B", but the
        // pointer hit is checked first
        let table = table(&["B[ruby text=nope]extra", "B", "C", "D"]);
        assert_eq!(find_translation("B", &table, 1, &KagParser), Some(1));
    }

    #[test]
    fn test_forward_scan() {
        let table = table(&["A", "B", "C", "D"]);
        assert_eq!(find_translation("D", &table, 1, &KagParser), Some(3));
    }

    #[test]
    fn test_backward_scan() {
        let table = table(&["A", "B", "C", "D"]);
        assert_eq!(find_translation("A", &table, 3, &KagParser), Some(0));
    }

    #[test]
    fn test_decomposed_fragment_match() {
        let table = table(&["A", "Hello[ruby text=ann]world", "C"]);
        assert_eq!(find_translation("world", &table, 0, &KagParser), Some(1));
    }

    #[test]
    fn test_full_table_fallback_beyond_window() {
        let mut originals: Vec<String> = (0..40).map(|i| format!("row{i}")).collect();
        originals[39] = "needle".to_string();
        let refs: Vec<&str> = originals.iter().map(String::as_str).collect();
        let table = table(&refs);
        // distance 39 from the pointer, unreachable by the ±15 windows
        assert_eq!(find_translation("needle", &table, 0, &KagParser), Some(39));
    }

    #[test]
    fn test_not_found() {
        let table = table(&["A", "B"]);
        assert_eq!(find_translation("missing", &table, 0, &KagParser), None);
    }

    #[test]
    fn test_original_strings_set_includes_fragments() {
        let table = table(&["plain", "Hello[ruby text=ann]world"]);
        let set = original_strings_set(&table, &KagParser);
        assert!(set.contains("plain"));
        assert!(set.contains("Helloworld"));
        assert!(set.contains("Hello"));
        assert!(set.contains("world"));
    }
}
