//! Multi-pass de-obfuscation of encoded prompt content.
//!
//! [`EncodingDecoder`] repeatedly applies URL decoding, embedded Base64 and
//! hex substitution, and Unicode normalization until a pass changes nothing
//! (or the pass budget runs out), then collapses letter-by-letter spacing
//! once.  Downstream detectors scan the decoded view.
//!
//! Replacement is local: an encoded fragment embedded in prose is unwrapped
//! in place without touching the surrounding text, and a fragment that does
//! not decode to printable UTF-8 is left exactly as it was.  Acceptance is
//! deliberately conservative — a loose gate here cascades into pattern
//! false positives downstream.

use std::borrow::Cow;

use base64::Engine;
use regex::Regex;

use crate::report::DecodingReport;

use super::entropy::{printable_ratio, shannon_entropy};
use super::normalize::normalize_unicode;

/// Default number of decode passes.
pub const DEFAULT_MAX_PASSES: usize = 3;

/// Minimum decoded length (chars) for an embedded fragment to be accepted.
const MIN_DECODED_CHARS: usize = 3;

/// Minimum printable ratio for an embedded fragment to be accepted.
const MIN_PRINTABLE_RATIO: f64 = 0.7;

/// Minimum run length (tokens) for whitespace-obfuscation collapse.
const MIN_SPACED_RUN: usize = 5;

/// Recursive decoder for obfuscated prompt content.
///
/// Compiled once and shared immutably across scans.
#[derive(Debug)]
pub struct EncodingDecoder {
    /// Base64 runs of 12+ chars with valid padding.
    base64_re: Regex,
    /// Runs of 4+ hex bytes, optionally `0x`-prefixed and space-separated.
    /// The numeric portion is captured separately so the prefix is never
    /// fed to the hex decoder.
    hex_re: Regex,
}

impl EncodingDecoder {
    /// Build a decoder.  The embedded regexes are literals; compilation
    /// cannot fail for a released build.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base64_re: Regex::new(
                r"(?:[A-Za-z0-9+/]{4}){2,}(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=|[A-Za-z0-9+/]{4})",
            )
            .expect("base64 candidate regex is valid"),
            hex_re: Regex::new(r"(?:0x)?([0-9a-fA-F]{2}(?:\s?[0-9a-fA-F]{2}){3,})")
                .expect("hex candidate regex is valid"),
        }
    }

    /// Run the full decode pipeline with the default pass budget.
    #[must_use]
    pub fn decode(&self, text: &str) -> DecodingReport {
        self.decode_with_passes(text, DEFAULT_MAX_PASSES)
    }

    /// Run the decode pipeline with an explicit pass budget.
    ///
    /// Deterministic and pure: equal inputs produce equal reports.
    #[must_use]
    pub fn decode_with_passes(&self, text: &str, max_passes: usize) -> DecodingReport {
        let mut transformations: Vec<String> = Vec::new();
        let mut current = text.to_owned();

        for pass in 1..=max_passes {
            let mut changed_this_pass = false;

            if let Some(next) = url_decode(&current) {
                current = next;
                transformations.push(format!("pass{pass}:url_decode"));
                changed_this_pass = true;
            }

            let (next, changed) = self.decode_base64_segments(&current);
            if changed {
                current = next;
                transformations.push(format!("pass{pass}:base64_decode"));
                changed_this_pass = true;
            }

            let (next, changed) = self.decode_hex_segments(&current);
            if changed {
                current = next;
                transformations.push(format!("pass{pass}:hex_decode"));
                changed_this_pass = true;
            }

            if let Some(next) = normalize_pass(&current) {
                current = next;
                transformations.push(format!("pass{pass}:unicode_normalize"));
                changed_this_pass = true;
            }

            if !changed_this_pass {
                break;
            }
        }

        // Letter-by-letter spelling ("A K I A 1 2 3 4") is collapsed once,
        // after the decode loop, so it cannot interact with pass counting.
        let collapsed = collapse_spaced_runs(&current);
        if collapsed != current {
            current = collapsed;
            transformations.push("whitespace_collapse".to_owned());
        }

        DecodingReport {
            entropy_original: shannon_entropy(text),
            entropy_decoded: shannon_entropy(&current),
            was_encoded: !transformations.is_empty(),
            original: text.to_owned(),
            decoded: current,
            transformations,
        }
    }

    /// Substitute embedded Base64 fragments that decode to printable UTF-8.
    fn decode_base64_segments(&self, text: &str) -> (String, bool) {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut changed = false;

        for m in self.base64_re.find_iter(text) {
            out.push_str(&text[last..m.start()]);
            match decode_base64_candidate(m.as_str()) {
                Some(decoded) => {
                    out.push_str(&decoded);
                    changed = true;
                }
                None => out.push_str(m.as_str()),
            }
            last = m.end();
        }
        out.push_str(&text[last..]);
        (out, changed)
    }

    /// Substitute embedded hex fragments that decode to printable UTF-8.
    ///
    /// The whole match (including any `0x` prefix) is replaced, but only
    /// the captured numeric portion is decoded.
    fn decode_hex_segments(&self, text: &str) -> (String, bool) {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut changed = false;

        for caps in self.hex_re.captures_iter(text) {
            let whole = caps.get(0).expect("group 0 is the whole match");
            out.push_str(&text[last..whole.start()]);
            match decode_hex_candidate(&caps[1]) {
                Some(decoded) => {
                    out.push_str(&decoded);
                    changed = true;
                }
                None => out.push_str(whole.as_str()),
            }
            last = whole.end();
        }
        out.push_str(&text[last..]);
        (out, changed)
    }
}

impl Default for EncodingDecoder {
    fn default() -> Self {
        Self::new()
    }
}

// ── Candidate decoders ─────────────────────────────────────────────────

/// Gate shared by all embedded decoders: strict UTF-8, a minimum length,
/// and a minimum printable ratio.
fn accept_decoded(bytes: Vec<u8>) -> Option<String> {
    let decoded = String::from_utf8(bytes).ok()?;
    if decoded.chars().count() < MIN_DECODED_CHARS {
        return None;
    }
    if printable_ratio(&decoded) <= MIN_PRINTABLE_RATIO {
        return None;
    }
    Some(decoded)
}

fn decode_base64_candidate(candidate: &str) -> Option<String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(candidate)
        .ok()?;
    accept_decoded(bytes)
}

fn decode_hex_candidate(candidate: &str) -> Option<String> {
    let compact: String = candidate.chars().filter(|&c| c != ' ').collect();
    let bytes = hex::decode(&compact).ok()?;
    accept_decoded(bytes)
}

/// Percent-decode the entire string.  Returns `Some` only when the text
/// changed; malformed sequences leave the input untouched.
fn url_decode(text: &str) -> Option<String> {
    match urlencoding::decode(text) {
        Ok(Cow::Owned(decoded)) if decoded != text => Some(decoded),
        _ => None,
    }
}

/// NFC + confusable folding as a decode-loop op.
fn normalize_pass(text: &str) -> Option<String> {
    let (normalized, changed) = normalize_unicode(text);
    changed.then(|| normalized.into_owned())
}

// ── Whitespace-obfuscation collapse ────────────────────────────────────

/// Fuse maximal runs of `MIN_SPACED_RUN`-or-more single non-whitespace
/// characters joined by single spaces ("A K I A 1 2 3 4" → "AKIA1234").
///
/// Only single-character tokens qualify, so ordinary word spacing is never
/// fused.
fn collapse_spaced_runs(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < n {
        if let Some((token_count, end)) = spaced_run(&chars, i) {
            if token_count >= MIN_SPACED_RUN {
                let mut k = i;
                while k < end {
                    out.push(chars[k]);
                    k += 2;
                }
                i = end;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

/// If `start` begins a run of single-character tokens separated by single
/// spaces, return `(token_count, end_index)` where `end_index` is one past
/// the last token character.
fn spaced_run(chars: &[char], start: usize) -> Option<(usize, usize)> {
    let n = chars.len();
    if chars[start].is_whitespace() {
        return None;
    }
    // A run must begin at a token boundary.
    if start > 0 && !chars[start - 1].is_whitespace() {
        return None;
    }
    // The first token must itself be a single character.
    if start + 1 < n && !chars[start + 1].is_whitespace() {
        return None;
    }

    let mut count = 1;
    let mut last = start;
    loop {
        let sep = last + 1;
        let next = last + 2;
        if next >= n || chars[sep] != ' ' || chars[next].is_whitespace() {
            break;
        }
        // The next token must also be a single character.
        if next + 1 < n && !chars[next + 1].is_whitespace() {
            break;
        }
        count += 1;
        last = next;
    }

    Some((count, last + 1))
}

// ── Tests ──────────────────────────────────────────────────────────────
