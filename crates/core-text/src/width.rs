//! Grapheme cluster display width.
//!
//! `egc_width` is the single authority for column widths. It starts from
//! `unicode_width` and widens emoji compositions the crate under-measures
//! (ZWJ sequences, flags, keycaps, skin-tone modifiers). The classifier
//! over-estimates on purpose: a spare blank column is harmless, a missing one
//! shifts every following glyph of the row.

use unicode_width::UnicodeWidthChar;

const ZWJ: char = '\u{200D}';
const VS16: char = '\u{FE0F}';
const KEYCAP: char = '\u{20E3}';

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

fn is_skin_tone_modifier(c: char) -> bool {
    ('\u{1F3FB}'..='\u{1F3FF}').contains(&c)
}

// Rough Extended Pictographic range: emoji blocks plus misc symbols/dingbats.
fn is_extended_pictographic(c: char) -> bool {
    ('\u{1F300}'..='\u{1FAFF}').contains(&c) || ('\u{2600}'..='\u{27BF}').contains(&c)
}

fn char_width(c: char) -> u16 {
    UnicodeWidthChar::width(c).unwrap_or(0) as u16
}

/// Column width of one grapheme cluster. Empty input is zero columns.
///
/// The caller is expected to pass a single cluster; use [`display_width`]
/// for arbitrary strings.
pub fn egc_width(egc: &str) -> u16 {
    let mut chars = egc.chars();
    let Some(first) = chars.next() else {
        return 0;
    };
    if first.is_ascii() && egc.len() == 1 {
        return u16::from(!first.is_ascii_control());
    }

    let mut pictographic = usize::from(is_extended_pictographic(first));
    let mut regional = usize::from(is_regional_indicator(first));
    let mut zwj = false;
    let mut presentation = false;
    let mut modifier = false;
    let mut last = first;
    for c in chars {
        pictographic += usize::from(is_extended_pictographic(c));
        regional += usize::from(is_regional_indicator(c));
        zwj |= c == ZWJ;
        presentation |= c == VS16;
        modifier |= is_skin_tone_modifier(c);
        last = c;
    }

    let base = char_width(first).max(1);
    let keycap = last == KEYCAP && (first.is_ascii_digit() || first == '#' || first == '*');
    let emoji = keycap
        || regional == 2
        || (zwj && pictographic >= 2)
        || (pictographic >= 1 && (modifier || presentation));
    if emoji || (pictographic >= 1 && base == 2) {
        2
    } else {
        base
    }
}

/// Sum of cluster widths for an arbitrary string.
pub fn display_width(s: &str) -> usize {
    crate::clusters(s).map(|c| c.width as usize).sum()
}

/// True for text known to occupy exactly one normal column without
/// consulting a font: empty text or a printable single-byte leading char.
///
/// Multi-byte text must be measured against the active font.
pub fn is_ascii_narrow(text: &str) -> bool {
    match text.as_bytes().first() {
        None => true,
        Some(b) => *b <= 127,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_one_column() {
        assert_eq!(egc_width("a"), 1);
        assert_eq!(egc_width(" "), 1);
        assert_eq!(egc_width(""), 0);
    }

    #[test]
    fn east_asian_wide_is_two() {
        assert_eq!(egc_width("界"), 2);
        assert_eq!(display_width("日本語"), 6);
    }

    #[test]
    fn combining_cluster_keeps_base_width() {
        assert_eq!(egc_width("e\u{301}"), 1);
    }

    #[test]
    fn emoji_compositions_are_wide() {
        assert_eq!(egc_width("👍🏽"), 2);
        assert_eq!(egc_width("🇯🇵"), 2);
        assert_eq!(egc_width("1\u{FE0F}\u{20E3}"), 2);
        assert_eq!(egc_width("👨\u{200D}👩\u{200D}👧"), 2);
    }

    #[test]
    fn narrow_shortcut_only_for_leading_ascii() {
        assert!(is_ascii_narrow(""));
        assert!(is_ascii_narrow("x"));
        assert!(!is_ascii_narrow("界"));
        assert!(!is_ascii_narrow("é"));
    }
}
