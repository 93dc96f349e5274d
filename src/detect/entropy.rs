//! Shannon entropy and printable-ratio measurements.
//!
//! Entropy is computed over *character* frequencies (not bytes) so that a
//! secret spelled in multibyte script scores the same as its transliterated
//! form.  The printable ratio gates acceptance of decoded fragments in the
//! [`decode`](super::decode) stage.

use rustc_hash::FxHashMap;

/// Shannon entropy of `text` in bits per character.
///
/// `H = -Σ (n_i/|s|)·log2(n_i/|s|)` over character frequencies.  The empty
/// string and any single-character string both return `0.0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn shannon_entropy(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }

    let mut counts: FxHashMap<char, u32> = FxHashMap::default();
    let mut total = 0u32;
    for ch in text.chars() {
        *counts.entry(ch).or_insert(0) += 1;
        total += 1;
    }

    let len = f64::from(total);
    let mut entropy = 0.0_f64;
    for &count in counts.values() {
        let p = f64::from(count) / len;
        entropy -= p * p.log2();
    }
    entropy
}

/// Fraction of characters in `text` that are printable or whitespace.
///
/// Returns `0.0` for the empty string.  Control characters other than
/// whitespace count against the ratio; everything else counts for it.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn printable_ratio(text: &str) -> f64 {
    let mut printable = 0usize;
    let mut total = 0usize;
    for ch in text.chars() {
        total += 1;
        if ch.is_whitespace() || !ch.is_control() {
            printable += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    printable as f64 / total as f64
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // 1. Empty string has zero entropy
    #[test]
    fn empty_string_zero_entropy() {
        assert_eq!(shannon_entropy(""), 0.0);
    }

    // 2. Single repeated character has zero entropy
    #[test]
    fn uniform_string_zero_entropy() {
        assert_eq!(shannon_entropy("a"), 0.0);
        assert_eq!(shannon_entropy("aaaaaaaa"), 0.0);
    }

    // 3. Two equiprobable symbols → exactly 1 bit
    #[test]
    fn two_symbol_entropy_is_one_bit() {
        let h = shannon_entropy("abababab");
        assert!((h - 1.0).abs() < 1e-12, "expected 1.0, got {h}");
    }

    // 4. Entropy grows with alphabet size on uniform strings
    #[test]
    fn entropy_nondecreasing_with_alphabet() {
        let h2 = shannon_entropy("ab");
        let h4 = shannon_entropy("abcd");
        let h8 = shannon_entropy("abcdefgh");
        assert!(h2 <= h4 && h4 <= h8);
        assert!((h8 - 3.0).abs() < 1e-12);
    }

    // 5. Random-looking secrets clear the 3.0-bit validator threshold
    #[test]
    fn secret_material_exceeds_three_bits() {
        let h = shannon_entropy("wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY");
        assert!(h > 3.0, "expected > 3.0 bits, got {h}");
    }

    // 6. Dictionary words fall under the threshold
    #[test]
    fn repeated_word_stays_low() {
        let h = shannon_entropy("aaaabbbb");
        assert!(h <= 3.0);
    }

    // 7. Multibyte characters count as single symbols
    #[test]
    fn multibyte_counted_per_char() {
        // Four distinct chars, uniform → 2 bits regardless of encoding width.
        let h = shannon_entropy("aé漢🦀");
        assert!((h - 2.0).abs() < 1e-12, "expected 2.0, got {h}");
    }

    // 8. Printable ratio of plain text is 1.0
    #[test]
    fn printable_ratio_plain_text() {
        assert_eq!(printable_ratio("hello world\n"), 1.0);
    }

    // 9. Control bytes drag the ratio down
    #[test]
    fn printable_ratio_counts_control_chars() {
        let s = "ab\u{0000}\u{0001}";
        let ratio = printable_ratio(s);
        assert!((ratio - 0.5).abs() < 1e-12, "expected 0.5, got {ratio}");
    }

    // 10. Empty input has ratio 0.0 (never accepted by decode gates)
    #[test]
    fn printable_ratio_empty() {
        assert_eq!(printable_ratio(""), 0.0);
    }
}
