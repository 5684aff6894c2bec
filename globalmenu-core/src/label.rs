// SPDX-License-Identifier: LGPL-3.0-only
//! Access-key label formatting.
//!
//! XUL keeps the label and the access key in separate attributes, dbusmenu
//! wants a single string where `_` marks the mnemonic and `__` is a literal
//! underscore.

/// Default maximum label length, in characters.
pub const MAX_LABEL_CHARS: usize = 40;

const ELLIPSIS_CHARS: usize = 3;

/// Case conversion service.
pub trait CaseConverter {
    /// Upper-case form of `c`.
    fn to_upper(&self, c: char) -> char;
    /// Lower-case form of `c`.
    fn to_lower(&self, c: char) -> char;
}

/// Case conversion backed by the Unicode tables in `core`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeCase;

impl CaseConverter for UnicodeCase {
    fn to_upper(&self, c: char) -> char {
        single(c.to_uppercase()).unwrap_or(c)
    }

    fn to_lower(&self, c: char) -> char {
        single(c.to_lowercase()).unwrap_or(c)
    }
}

fn single(mut chars: impl Iterator<Item = char>) -> Option<char> {
    let first = chars.next()?;
    match chars.next() {
        Some(_) => None,
        None => Some(first),
    }
}

/// Upper and lower case forms of `key`.
///
/// Without a converter only ASCII characters fold; anything else matches
/// case-sensitively.
pub fn fold_key(key: char, case: Option<&dyn CaseConverter>) -> (char, char) {
    match case {
        Some(converter) => (converter.to_upper(key), converter.to_lower(key)),
        None if key.is_ascii() => (key.to_ascii_uppercase(), key.to_ascii_lowercase()),
        None => {
            log::debug!("Access key {key:?} is matched case-sensitively");
            (key, key)
        },
    }
}

/// Case-insensitive comparison of two access keys.
pub fn keys_match(a: char, b: char, case: Option<&dyn CaseConverter>) -> bool {
    let (upper, lower) = fold_key(a, case);
    b == upper || b == lower
}

/// Merge `label` and `access_key` into a dbusmenu label.
///
/// Existing underscores are doubled. The access key is marked at its first
/// case-insensitive occurrence that starts a word, or at its first occurrence
/// anywhere if no word starts with it. Labels longer than `max_chars` are cut
/// to `max_chars` with the last three characters replaced by dots.
pub fn format_label(label: &str, access_key: &str, case: Option<&dyn CaseConverter>, max_chars: usize) -> String {
    let chars: Vec<char> = label.chars().collect();
    let mark = access_key
        .chars()
        .next()
        .and_then(|key| access_key_position(&chars, key, case));

    let mut out: Vec<char> = Vec::with_capacity(chars.len() + 2);
    for (index, c) in chars.iter().copied().enumerate() {
        if c == '_' {
            out.push('_');
        } else if mark == Some(index) {
            out.push('_');
        }
        out.push(c);
    }

    if out.len() > max_chars {
        out.truncate(max_chars);
        let dots = ELLIPSIS_CHARS.min(max_chars);
        for c in out.iter_mut().skip(max_chars - dots) {
            *c = '.';
        }
    }
    out.into_iter().collect()
}

fn access_key_position(chars: &[char], key: char, case: Option<&dyn CaseConverter>) -> Option<usize> {
    let (upper, lower) = fold_key(key, case);
    let matches = |c: char| c != '_' && (c == upper || c == lower);

    let word_start = chars.iter().enumerate().position(|(i, c)| {
        matches(*c) && (i == 0 || chars[i - 1].is_whitespace())
    });
    word_start.or_else(|| chars.iter().position(|c| matches(*c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(label: &str, key: &str) -> String {
        format_label(label, key, Some(&UnicodeCase), MAX_LABEL_CHARS)
    }

    #[test]
    fn test_access_key_marking() {
        assert_eq!(fmt("Save", "s"), "_Save");
        assert_eq!(fmt("Save As", "a"), "Save _As");
        assert_eq!(fmt("Save", ""), "Save");
        assert_eq!(fmt("Save", "z"), "Save");
        assert_eq!(fmt("Print Preview", "v"), "Print Pre_view");
    }

    #[test]
    fn test_underscores_are_escaped() {
        assert_eq!(fmt("snake_case", ""), "snake__case");
        assert_eq!(fmt("a_b", "b"), "a___b");
    }

    #[test]
    fn test_long_labels_are_ellipsized() {
        let label = "x".repeat(60);
        let out = fmt(&label, "");
        assert_eq!(out.chars().count(), MAX_LABEL_CHARS);
        assert!(out.ends_with("..."));
        assert_eq!(&out[..MAX_LABEL_CHARS - 3], &label[..MAX_LABEL_CHARS - 3]);

        let exact = "y".repeat(MAX_LABEL_CHARS);
        assert_eq!(fmt(&exact, ""), exact);
    }

    #[test]
    fn test_ascii_fallback_without_converter() {
        assert_eq!(format_label("Open", "O", None, MAX_LABEL_CHARS), "_Open");
        assert_eq!(format_label("Ödem", "ö", None, MAX_LABEL_CHARS), "Ödem");
        assert_eq!(format_label("Ödem", "ö", Some(&UnicodeCase), MAX_LABEL_CHARS), "_Ödem");
        assert_eq!(fold_key('é', None), ('é', 'é'));
        assert!(keys_match('q', 'Q', None));
        assert!(!keys_match('é', 'É', None));
    }
}
