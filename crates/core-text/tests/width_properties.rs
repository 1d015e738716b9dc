use core_text::{clusters, display_width, egc_width};
use proptest::prelude::*;

proptest! {
    #[test]
    fn cluster_widths_sum_to_display_width(s in "\\PC{0,24}") {
        let sum: usize = clusters(&s).map(|c| c.width as usize).sum();
        prop_assert_eq!(sum, display_width(&s));
    }

    #[test]
    fn printable_ascii_is_one_column_each(s in "[ -~]{0,40}") {
        prop_assert_eq!(display_width(&s), s.len());
    }

    #[test]
    fn cluster_width_never_exceeds_two(s in "\\PC{1,8}") {
        for c in clusters(&s) {
            prop_assert!(egc_width(c.text) <= 2);
        }
    }
}
