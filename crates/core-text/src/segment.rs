//! Grapheme segmentation adapter.
//!
//! Clusters are yielded in order, never overlap and cover the whole input.

use crate::egc_width;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cluster<'a> {
    pub text: &'a str,
    /// Byte offset of the cluster in the input.
    pub start: usize,
    pub width: u16,
}

pub fn clusters(input: &str) -> impl Iterator<Item = Cluster<'_>> {
    input.grapheme_indices(true).map(|(start, text)| Cluster {
        text,
        start,
        width: egc_width(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clusters_cover_input() {
        let s = "ae\u{301}界x";
        let parts: Vec<_> = clusters(s).collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1].text, "e\u{301}");
        assert_eq!(parts[2].width, 2);
        let joined: String = parts.iter().map(|c| c.text).collect();
        assert_eq!(joined, s);
    }
}
