//! Property-based invariants over arbitrary inputs.
//!
//! These pin the algebraic contracts of the pipeline: determinism, score
//! range, threshold monotonicity, span integrity, decode stability, and
//! the entropy edge cases.

use std::sync::LazyLock;

use promptgate::detect::EncodingDecoder;
use promptgate::detect::entropy::{printable_ratio, shannon_entropy};
use promptgate::prelude::*;
use proptest::prelude::*;

static PIPELINE: LazyLock<DetectionPipeline> =
    LazyLock::new(|| DetectionPipeline::with_defaults().expect("default pipeline should build"));

static DECODER: LazyLock<EncodingDecoder> = LazyLock::new(EncodingDecoder::new);

proptest! {
    // Equal prompts produce equal verdicts, scores, and findings.
    #[test]
    fn scan_is_deterministic(text in ".{0,400}") {
        let a = PIPELINE.scan(&text, None);
        let b = PIPELINE.scan(&text, None);
        prop_assert_eq!(a.risk_score, b.risk_score);
        prop_assert_eq!(a.action, b.action);
        prop_assert_eq!(a.prompt_hash, b.prompt_hash);
        prop_assert_eq!(a.detections.len(), b.detections.len());
    }

    // The risk score stays in [0, 1] and maps onto actions monotonically.
    #[test]
    fn score_range_and_action_consistency(text in ".{0,400}") {
        let result = PIPELINE.scan(&text, None);
        prop_assert!((0.0..=1.0).contains(&result.risk_score));

        let expected = if result.risk_score >= 0.70 {
            Action::Block
        } else if result.risk_score >= 0.30 {
            Action::Warn
        } else {
            Action::Allow
        };
        prop_assert_eq!(result.action, expected);

        if result.detections.is_empty() {
            prop_assert_eq!(result.risk_score, 0.0);
            prop_assert_eq!(result.action, Action::Allow);
        }
    }

    // Every detection's offsets index the scanned text and the span is a
    // prefix of the matched region.
    #[test]
    fn span_integrity(text in ".{0,400}") {
        let result = PIPELINE.scan(&text, None);
        let scanned = &result.decoding.as_ref().unwrap().decoded;
        for det in &result.detections {
            prop_assert!(det.start <= det.end);
            prop_assert!(det.end <= scanned.len());
            prop_assert!((0.0..=1.0).contains(&det.confidence));
            prop_assert!(scanned[det.start..det.end].starts_with(det.span.as_str()));
        }
    }

    // A report with no transformations is the identity, and was_encoded
    // mirrors the transformation list exactly.
    #[test]
    fn no_transformations_means_untouched(text in ".{0,300}") {
        let report = DECODER.decode(&text);
        prop_assert_eq!(report.was_encoded, !report.transformations.is_empty());
        if !report.was_encoded {
            prop_assert_eq!(&report.decoded, &report.original);
            prop_assert_eq!(&report.original, &text);
        }
    }

    // Prose built from non-encodable words passes through untouched, and a
    // second decode of any decoded view is the identity on it.
    #[test]
    fn plain_words_are_stable(words in proptest::collection::vec("[g-z]{2,8}", 0..24)) {
        let text = words.join(" ");
        let report = DECODER.decode(&text);
        prop_assert_eq!(&report.decoded, &text);
        prop_assert!(!report.was_encoded);

        let again = DECODER.decode(&report.decoded);
        prop_assert_eq!(&again.decoded, &report.decoded);
    }

    // Entropy is non-negative and bounded by log2 of the alphabet size.
    #[test]
    fn entropy_bounds(text in ".{0,300}") {
        let h = shannon_entropy(&text);
        prop_assert!(h >= 0.0);
        let distinct = text.chars().collect::<std::collections::HashSet<_>>().len();
        if distinct > 0 {
            #[allow(clippy::cast_precision_loss)]
            let bound = (distinct as f64).log2() + 1e-9;
            prop_assert!(h <= bound, "H = {} exceeds log2({})", h, distinct);
        } else {
            prop_assert_eq!(h, 0.0);
        }
    }

    // Printable ratio is a ratio.
    #[test]
    fn printable_ratio_bounds(text in ".{0,300}") {
        let r = printable_ratio(&text);
        prop_assert!((0.0..=1.0).contains(&r));
    }

    // Single-character alphabets carry zero information.
    #[test]
    fn repeated_char_zero_entropy(ch in proptest::char::any(), n in 1usize..64) {
        let text: String = std::iter::repeat_n(ch, n).collect();
        prop_assert_eq!(shannon_entropy(&text), 0.0);
    }
}
