//! Text normalization shared by the builder, matcher and resolver.
//!
//! Dictionary lookup treats text case- and accent-insensitively: everything
//! is lowercased, NFD-decomposed and stripped of combining marks before
//! comparison. The matcher additionally needs to map positions in the
//! normalized verse back to the original text, so it can report the
//! case-preserved surface form and its character index.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase and strip diacritics, keeping all other characters.
pub fn strip_diacritics(value: &str) -> String {
    value
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Normalize a search term: lowercase, strip diacritics, collapse
/// non-alphanumerics into single spaces, trim.
pub fn normalize_term(value: &str) -> String {
    let stripped: String = strip_diacritics(value)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convert a display word into the token segment of a dictionary key:
/// lowercase, strip diacritics, collapse runs of non-alphanumerics into a
/// single underscore, trim leading/trailing underscores.
pub fn word_to_token(word: &str) -> String {
    let replaced: String = strip_diacritics(word)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    let mut token = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '_' && token.ends_with('_') {
            continue;
        }
        token.push(c);
    }
    token.trim_matches('_').to_string()
}

/// A verse text normalized for matching, with a byte-offset map back into
/// the original string.
///
/// `offsets[i]` is the byte offset in the original text of the character
/// that produced normalized byte `i`. Normalization may change byte widths
/// (precomposed accents decompose and lose their marks), so matches found
/// in `text` must go through the map to slice the original.
#[derive(Debug, Clone)]
pub struct NormalizedText {
    pub text: String,
    offsets: Vec<usize>,
    original_len: usize,
}

impl NormalizedText {
    /// Normalize `original` the same way [`normalize_term`] does, except that
    /// whitespace is preserved positionally (non-alphanumerics become single
    /// spaces in place rather than being collapsed).
    pub fn new(original: &str) -> Self {
        let mut text = String::with_capacity(original.len());
        let mut offsets = Vec::with_capacity(original.len());

        for (byte_idx, ch) in original.char_indices() {
            for lowered in ch.to_lowercase() {
                for decomposed in lowered.nfd() {
                    if is_combining_mark(decomposed) {
                        continue;
                    }
                    let out = if decomposed.is_alphanumeric() {
                        decomposed
                    } else {
                        ' '
                    };
                    let before = text.len();
                    text.push(out);
                    for _ in before..text.len() {
                        offsets.push(byte_idx);
                    }
                }
            }
        }

        Self {
            text,
            offsets,
            original_len: original.len(),
        }
    }

    /// Map a byte range in the normalized text to the byte range in the
    /// original text.
    pub fn original_range(&self, start: usize, end: usize) -> (usize, usize) {
        let orig_start = self.offsets.get(start).copied().unwrap_or(self.original_len);
        let orig_end = self.offsets.get(end).copied().unwrap_or(self.original_len);
        (orig_start, orig_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_diacritics() {
        assert_eq!(strip_diacritics("Princípio"), "principio");
        assert_eq!(strip_diacritics("CÉUS"), "ceus");
        assert_eq!(strip_diacritics("shalom"), "shalom");
    }

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term("  Bem-Aventurado  "), "bem aventurado");
        assert_eq!(normalize_term("céus/firmamento"), "ceus firmamento");
        assert_eq!(normalize_term(""), "");
    }

    #[test]
    fn test_word_to_token() {
        assert_eq!(word_to_token("Princípio"), "principio");
        assert_eq!(word_to_token("bem-aventurado"), "bem_aventurado");
        assert_eq!(word_to_token("  terra!  "), "terra");
        assert_eq!(word_to_token("---"), "");
    }

    #[test]
    fn test_normalized_text_plain_ascii() {
        let n = NormalizedText::new("No principio criou Deus");
        assert_eq!(n.text, "no principio criou deus");
        let pos = n.text.find("principio").unwrap();
        let (start, end) = n.original_range(pos, pos + "principio".len());
        assert_eq!(&"No principio criou Deus"[start..end], "principio");
    }

    #[test]
    fn test_normalized_text_maps_accented_ranges() {
        let original = "os céus e a terra";
        let n = NormalizedText::new(original);
        assert_eq!(n.text, "os ceus e a terra");
        let pos = n.text.find("ceus").unwrap();
        let (start, end) = n.original_range(pos, pos + "ceus".len());
        assert_eq!(&original[start..end], "céus");
    }

    #[test]
    fn test_normalized_text_range_at_end() {
        let n = NormalizedText::new("terra");
        let (start, end) = n.original_range(0, 5);
        assert_eq!((start, end), (0, 5));
    }
}
