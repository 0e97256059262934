use std::borrow::Cow;
use std::ops::Range;
use textwrap::Options;

/// Returns byte-ranges into `text` for each wrapped line, including
/// trailing whitespace and a +1 sentinel byte. Used by the textarea
/// cursor-position logic.
pub(crate) fn wrap_ranges<'a, O>(text: &str, width_or_options: O) -> Vec<Range<usize>>
where
    O: Into<Options<'a>>,
{
    let opts = width_or_options.into();
    let base = text.as_ptr() as usize;
    let mut lines: Vec<Range<usize>> = Vec::new();
    let mut cursor = 0usize;
    for line in textwrap::wrap(text, &opts).iter() {
        let (start, end) = match line {
            Cow::Borrowed(slice) => {
                let offset = (slice.as_ptr() as usize).wrapping_sub(base);
                let start = if offset <= text.len() { offset } else { cursor };
                (start, (start + slice.len()).min(text.len()))
            }
            // Owned lines only appear when textwrap rewrites the text; locate
            // them relative to the previous line.
            Cow::Owned(slice) => {
                let start = text[cursor..]
                    .find(slice.as_str())
                    .map_or(cursor, |offset| cursor + offset);
                (start, (start + slice.len()).min(text.len()))
            }
        };
        let trailing_spaces = text[end..].chars().take_while(|c| *c == ' ').count();
        lines.push(start..end + trailing_spaces + 1);
        cursor = end + trailing_spaces;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ranges_cover_trailing_spaces_and_sentinel() {
        let text = "please use 8192";
        let ranges = wrap_ranges(text, 11);
        assert_eq!(ranges, vec![0..12, 11..16]);
        assert_eq!(&text[ranges[0].start..ranges[0].end - 1], "please use ");
        assert_eq!(&text[ranges[1].start..ranges[1].end - 1], "8192");
    }

    #[test]
    fn hard_newlines_start_new_ranges() {
        let ranges = wrap_ranges("ab\ncd", 10);
        assert_eq!(ranges, vec![0..3, 3..6]);
    }

    #[test]
    fn empty_text_has_one_line() {
        assert_eq!(wrap_ranges("", 10), vec![0..1]);
    }
}
