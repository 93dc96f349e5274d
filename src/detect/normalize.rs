//! Unicode canonicalization and confusable folding.
//!
//! Applies NFC normalization, then folds characters that are visually
//! identical to ASCII (Cyrillic homoglyphs and the full-width ASCII block)
//! onto their ASCII equivalents.  This runs as the last op of every decode
//! pass so that `AKІA`-style homoglyph spellings reach the pattern engine
//! in plain ASCII.

use std::borrow::Cow;

use unicode_normalization::{IsNormalized, UnicodeNormalization, is_nfc_quick};

/// Sorted lookup table mapping Cyrillic confusables to their ASCII
/// equivalents.  Binary-searched at runtime.
static CONFUSABLES: &[(char, char)] = &[
    // Cyrillic uppercase (U+0410–U+0425)
    ('\u{0410}', 'A'), // А → A
    ('\u{0412}', 'B'), // В → B
    ('\u{0415}', 'E'), // Е → E
    ('\u{041A}', 'K'), // К → K
    ('\u{041C}', 'M'), // М → M
    ('\u{041D}', 'H'), // Н → H
    ('\u{041E}', 'O'), // О → O
    ('\u{0420}', 'P'), // Р → P
    ('\u{0421}', 'C'), // С → C
    ('\u{0422}', 'T'), // Т → T
    ('\u{0425}', 'X'), // Х → X
    // Cyrillic lowercase (U+0430–U+04BB)
    ('\u{0430}', 'a'), // а → a
    ('\u{0432}', 'b'), // в → b
    ('\u{0435}', 'e'), // е → e
    ('\u{043C}', 'm'), // м → m
    ('\u{043D}', 'h'), // н → h
    ('\u{043E}', 'o'), // о → o
    ('\u{0440}', 'p'), // р → p
    ('\u{0441}', 'c'), // с → c
    ('\u{0442}', 't'), // т → t
    ('\u{0443}', 'y'), // у → y
    ('\u{0445}', 'x'), // х → x
    ('\u{0455}', 's'), // ѕ → s
    ('\u{0456}', 'i'), // і → i
    ('\u{0458}', 'j'), // ј → j
    ('\u{04BB}', 'h'), // һ → h
];

/// Fold a single confusable character to ASCII, if it is one.
fn fold_char(ch: char) -> Option<char> {
    // Full-width ASCII block: ！ (U+FF01) … ～ (U+FF5E) maps 1:1 onto
    // ! (U+0021) … ~ (U+007E).
    if ('\u{FF01}'..='\u{FF5E}').contains(&ch) {
        let offset = ch as u32 - 0xFF01;
        return char::from_u32(0x21 + offset);
    }
    CONFUSABLES
        .binary_search_by_key(&ch, |&(k, _)| k)
        .ok()
        .map(|idx| CONFUSABLES[idx].1)
}

/// Apply NFC normalization followed by confusable folding.
///
/// Returns the transformed text and whether anything changed.  The fast
/// path for already-normalized ASCII-ish text performs no allocation.
#[must_use]
pub fn normalize_unicode(input: &str) -> (Cow<'_, str>, bool) {
    let composed: Cow<'_, str> = if is_nfc_quick(input.chars()) == IsNormalized::Yes {
        Cow::Borrowed(input)
    } else {
        let normalized: String = input.nfc().collect();
        if normalized == input {
            Cow::Borrowed(input)
        } else {
            Cow::Owned(normalized)
        }
    };
    let nfc_changed = matches!(composed, Cow::Owned(_));

    // Fold pass only allocates when at least one substitution is made.
    if !composed.chars().any(|c| fold_char(c).is_some()) {
        return (composed, nfc_changed);
    }
    let folded: String = composed
        .chars()
        .map(|c| fold_char(c).unwrap_or(c))
        .collect();
    (Cow::Owned(folded), true)
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // 1. Plain ASCII passes through untouched, borrowed
    #[test]
    fn ascii_fast_path() {
        let (out, changed) = normalize_unicode("plain ascii text");
        assert!(!changed);
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    // 2. Cyrillic homoglyph spelling of an AWS key prefix folds to ASCII
    #[test]
    fn cyrillic_homoglyphs_fold() {
        // "АKІА" — А (U+0410) and І (U+0406 is not mapped; use і U+0456)
        let (out, changed) = normalize_unicode("\u{0410}K\u{0456}\u{0410}");
        assert!(changed);
        assert_eq!(out.as_ref(), "AKiA");
    }

    // 3. Full sentence with Cyrillic о's normalizes to plain ASCII
    #[test]
    fn cyrillic_sentence_folds() {
        let input = "my passw\u{043E}rd is secret";
        let (out, changed) = normalize_unicode(input);
        assert!(changed);
        assert_eq!(out.as_ref(), "my password is secret");
    }

    // 4. Full-width ASCII folds onto the plain block
    #[test]
    fn fullwidth_ascii_folds() {
        let input = "\u{FF41}\u{FF42}\u{FF43}\u{FF11}\u{FF12}\u{FF13}"; // ａｂｃ１２３
        let (out, changed) = normalize_unicode(input);
        assert!(changed);
        assert_eq!(out.as_ref(), "abc123");
    }

    // 5. NFC composition: e + combining acute → é
    #[test]
    fn nfc_composes_combining_marks() {
        let input = "caf\u{0065}\u{0301}"; // "cafe" + combining acute
        let (out, changed) = normalize_unicode(input);
        assert!(changed);
        assert_eq!(out.as_ref(), "caf\u{00E9}");
    }

    // 6. Unmapped Cyrillic stays (only the homoglyph set folds)
    #[test]
    fn unmapped_cyrillic_preserved() {
        // ж (U+0436) has no Latin lookalike
        let (out, _) = normalize_unicode("\u{0436}");
        assert_eq!(out.as_ref(), "\u{0436}");
    }

    // 7. Confusable table is sorted (binary search precondition)
    #[test]
    fn confusable_table_sorted() {
        for pair in CONFUSABLES.windows(2) {
            assert!(pair[0].0 < pair[1].0, "table out of order at {:?}", pair);
        }
    }

    // 8. Fold boundaries of the full-width block
    #[test]
    fn fullwidth_block_boundaries() {
        assert_eq!(fold_char('\u{FF01}'), Some('!'));
        assert_eq!(fold_char('\u{FF5E}'), Some('~'));
        assert_eq!(fold_char('\u{FF5F}'), None);
        assert_eq!(fold_char('\u{FF00}'), None);
    }
}
