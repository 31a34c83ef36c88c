// Copyright 2024 The Jujutsu Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::borrow::Cow;

use unicode_width::UnicodeWidthChar as _;
use unicode_width::UnicodeWidthStr as _;

const TAB_STOP: usize = 8;

/// Replaces tabs with spaces up to the next tab stop.
pub fn expand_tabs(text: &str) -> Cow<'_, str> {
    if !text.contains('\t') {
        return Cow::Borrowed(text);
    }
    let mut expanded = String::with_capacity(text.len() + TAB_STOP);
    let mut width = 0;
    for c in text.chars() {
        if c == '\t' {
            let fill = TAB_STOP - width % TAB_STOP;
            expanded.extend(std::iter::repeat(' ').take(fill));
            width += fill;
        } else {
            expanded.push(c);
            width += c.width().unwrap_or(0);
        }
    }
    Cow::Owned(expanded)
}

/// Shortens `text` to `max_width` by removing trailing characters. `ellipsis`
/// is added if the `text` gets truncated.
///
/// The returned string (including `ellipsis`) never exceeds the `max_width`.
pub fn elide_end<'a>(text: &'a str, ellipsis: &'a str, max_width: usize) -> (Cow<'a, str>, usize) {
    let (text_end, text_width) = truncate_end_pos(text, max_width);
    if text_end == text.len() {
        return (Cow::Borrowed(text), text_width);
    }

    let (ellipsis_end, ellipsis_width) = truncate_end_pos(ellipsis, max_width);
    if ellipsis_end != ellipsis.len() {
        return (Cow::Borrowed(&ellipsis[..ellipsis_end]), ellipsis_width);
    }

    let max_text_width = max_width - ellipsis_width;
    let (text_end, text_width) = truncate_end_pos(text, max_text_width);
    let text = trim_end_zero_width_chars(&text[..text_end]);
    (
        Cow::Owned([text, ellipsis].concat()),
        text_width + ellipsis_width,
    )
}

/// Shortens `text` to `max_width` by removing trailing characters, returning
/// `(end_index, width)`.
fn truncate_end_pos(text: &str, max_width: usize) -> (usize, usize) {
    let mut acc_width = 0;
    for (i, c) in text.char_indices() {
        let new_width = acc_width + c.width().unwrap_or(0);
        if new_width > max_width {
            return (i, acc_width);
        }
        acc_width = new_width;
    }
    (text.len(), acc_width)
}

/// Removes trailing 0-width characters.
fn trim_end_zero_width_chars(text: &str) -> &str {
    text.trim_end_matches(|c: char| c.width().unwrap_or(0) == 0)
}

/// Fits `text` into exactly `width` columns, eliding or padding with spaces.
pub fn fit_to_width(text: &str, width: usize) -> String {
    let (text, text_width) = elide_end(text, ">", width);
    let mut fitted = text.into_owned();
    fitted.extend(std::iter::repeat(' ').take(width - text_width));
    debug_assert_eq!(fitted.width(), width);
    fitted
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_expand_tabs() {
        assert_eq!(expand_tabs("no tabs"), "no tabs");
        assert_eq!(expand_tabs("\tx"), "        x");
        assert_eq!(expand_tabs("ab\tc"), "ab      c");
        assert_eq!(expand_tabs("12345678\t|"), "12345678        |");
    }

    #[test]
    fn test_elide_end_ascii() {
        assert_eq!(elide_end("", "", 1), ("".into(), 0));
        assert_eq!(elide_end("abcdef", "", 6), ("abcdef".into(), 6));
        assert_eq!(elide_end("abcdef", "", 5), ("abcde".into(), 5));
        assert_eq!(elide_end("abcdef", "-=~", 5), ("ab-=~".into(), 5));
        assert_eq!(elide_end("abcdef", "-=~", 2), ("-=".into(), 2));
        assert_eq!(elide_end("abcdef", "-=~", 0), ("".into(), 0));
    }

    #[test]
    fn test_elide_end_wide_chars() {
        // "両" takes two columns.
        assert_eq!(elide_end("a両b", ">", 4), ("a両b".into(), 4));
        assert_eq!(elide_end("a両b", ">", 3), ("a>".into(), 2));
        assert_eq!(elide_end("両両", ">", 4), ("両両".into(), 4));
        assert_eq!(elide_end("両両", ">", 3), ("両>".into(), 3));
    }

    #[test_case("abc", 5, "abc  "; "padded")]
    #[test_case("abcdef", 4, "abc>"; "elided")]
    #[test_case("a両b", 3, "a> "; "wide char at the cut")]
    #[test_case("", 0, ""; "empty")]
    fn test_fit_to_width(text: &str, width: usize, expected: &str) {
        assert_eq!(fit_to_width(text, width), expected);
    }
}
