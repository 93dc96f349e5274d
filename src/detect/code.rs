//! Heuristic source-code classifier.
//!
//! [`CodeClassifier`] scores text against five language profiles (keyword
//! sets + syntactic patterns) and a set of language-agnostic structural
//! markers, then combines the best language score with the structural score
//! into a single confidence.  Everything is density-based: raw hit counts
//! are normalized by line count so prompt length does not dominate.

use regex::{Regex, RegexSet};

use crate::report::{Category, CodeAnalysis, CodeFeatures, Detection, DetectorKind, Metadata, Severity};

/// Default confidence threshold for classifying text as code.
pub const DEFAULT_CODE_THRESHOLD: f64 = 0.55;

/// Inputs shorter than this (after trimming) are never code.
const MIN_CODE_CHARS: usize = 30;

/// Weight of keyword density vs pattern strength in a language score.
const KEYWORD_WEIGHT: f64 = 0.4;
const PATTERN_WEIGHT: f64 = 0.6;

/// Weight of the best language score vs the structural score.
const LANGUAGE_MIX: f64 = 0.6;
const STRUCTURAL_MIX: f64 = 0.4;

/// Per-marker structural contribution cap, and the overall cap.
const MARKER_CAP: f64 = 0.15;
const STRUCTURAL_CAP: f64 = 0.5;

/// Minimum language score for a language label to be attached.
const LANGUAGE_LABEL_FLOOR: f64 = 0.2;

// ── Language profiles ──────────────────────────────────────────────────

struct LanguageDef {
    name: &'static str,
    weight: f64,
    keywords: &'static [&'static str],
    patterns: &'static [&'static str],
}

const LANGUAGES: &[LanguageDef] = &[
    LanguageDef {
        name: "python",
        weight: 1.0,
        keywords: &[
            "def", "class", "import", "from", "return", "yield", "async", "await", "if", "elif",
            "else", "for", "while", "try", "except", "finally", "with", "lambda", "raise", "pass",
            "self", "__init__", "print",
        ],
        patterns: &[
            r"(?m)^\s*def\s+\w+\s*\(",
            r"(?m)^\s*class\s+\w+",
            r"(?m)^\s*import\s+\w+",
            r"(?m)^\s*from\s+\w+\s+import",
            r"if\s+__name__\s*==",
        ],
    },
    LanguageDef {
        name: "javascript",
        weight: 1.0,
        keywords: &[
            "const", "let", "var", "function", "return", "async", "await", "class", "extends",
            "import", "export", "require", "module", "console", "document", "window", "this",
            "new", "typeof",
        ],
        patterns: &[
            r"(?m)(?:const|let|var)\s+\w+\s*=",
            r"(?:function|=>)\s*",
            r"module\.exports",
            r"(?:import|export)\s+",
            r"console\.\w+\(",
        ],
    },
    LanguageDef {
        name: "java",
        weight: 1.0,
        keywords: &[
            "public", "private", "protected", "static", "void", "class", "interface", "extends",
            "implements", "import", "package", "return", "new", "this", "super", "final",
            "abstract",
        ],
        patterns: &[
            r"(?m)^\s*(?:public|private|protected)\s+",
            r"(?m)^\s*package\s+[\w.]+;",
            r"(?m)^\s*import\s+[\w.]+;",
            r"System\.\w+\.\w+\(",
        ],
    },
    LanguageDef {
        // SQL leakage is higher risk, hence the boosted weight.
        name: "sql",
        weight: 1.2,
        keywords: &[
            "SELECT", "INSERT", "UPDATE", "DELETE", "FROM", "WHERE", "JOIN", "CREATE", "ALTER",
            "DROP", "TABLE", "INDEX", "GROUP BY", "ORDER BY", "HAVING", "UNION",
        ],
        patterns: &[
            r"(?i)\bSELECT\b.+\bFROM\b",
            r"(?i)\bINSERT\s+INTO\b",
            r"(?i)\bCREATE\s+TABLE\b",
            r"(?i)\bALTER\s+TABLE\b",
        ],
    },
    LanguageDef {
        name: "shell",
        weight: 1.1,
        keywords: &[
            "#!/bin/bash", "echo", "export", "sudo", "chmod", "chown", "grep", "awk", "sed",
            "curl", "wget", "apt-get", "yum",
        ],
        patterns: &[
            r"(?m)^#!/bin/(?:bash|sh|zsh)",
            r"(?m)^\s*export\s+\w+=",
            r"\|\s*(?:grep|awk|sed|sort)\s",
        ],
    },
];

/// Language-agnostic structural markers, counted per line.
const STRUCTURAL_MARKERS: &[(&str, &str)] = &[
    ("braces", r"[{}]"),
    ("semicolons", r"(?m);\s*$"),
    ("indentation", r"(?m)^(?:    |\t)\S"),
    ("comments", r"(?://|#|/\*|\*/|<!--)"),
    ("string_literals", r#"(?:"[^"]{2,}"|'[^']{2,}'|`[^`]{2,}`)"#),
    ("operators", r"(?:===|!==|==|!=|>=|<=|&&|\|\||=>|->|\+=|-=|\*=|/=)"),
];

// ── CodeClassifier ─────────────────────────────────────────────────────

struct LanguageProfile {
    name: &'static str,
    weight: f64,
    keywords: RegexSet,
    patterns: RegexSet,
    pattern_count: usize,
}

/// Heuristic classifier for detecting source code in prompts.
///
/// Compiled once; scanning is pure and re-entrant.
pub struct CodeClassifier {
    threshold: f64,
    languages: Vec<LanguageProfile>,
    structural: Vec<(&'static str, Regex)>,
}

impl std::fmt::Debug for CodeClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeClassifier")
            .field("threshold", &self.threshold)
            .field("languages", &self.languages.len())
            .finish_non_exhaustive()
    }
}

impl CodeClassifier {
    /// Build a classifier with a custom code-confidence threshold.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        let languages = LANGUAGES
            .iter()
            .map(|def| {
                let keyword_res: Vec<String> = def
                    .keywords
                    .iter()
                    .map(|kw| format!(r"\b{}\b", regex::escape(kw)))
                    .collect();
                LanguageProfile {
                    name: def.name,
                    weight: def.weight,
                    keywords: RegexSet::new(&keyword_res)
                        .expect("keyword regexes are literal escapes"),
                    patterns: RegexSet::new(def.patterns)
                        .expect("language pattern regexes are valid"),
                    pattern_count: def.patterns.len(),
                }
            })
            .collect();

        let structural = STRUCTURAL_MARKERS
            .iter()
            .map(|&(name, raw)| {
                (
                    name,
                    Regex::new(raw).expect("structural marker regexes are valid"),
                )
            })
            .collect();

        Self {
            threshold,
            languages,
            structural,
        }
    }

    /// Build a classifier with the default threshold (0.55).
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CODE_THRESHOLD)
    }

    /// Analyze `text` for source-code characteristics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn analyze(&self, text: &str) -> CodeAnalysis {
        let trimmed = text.trim();
        if trimmed.chars().count() < MIN_CODE_CHARS {
            return CodeAnalysis::not_code();
        }

        let total_lines = trimmed.split('\n').count().max(1) as f64;
        let mut features = CodeFeatures::default();

        // Per-language scoring: distinct keyword hits + pattern coverage.
        let mut best: Option<(&'static str, f64)> = None;
        for lang in &self.languages {
            let keyword_hits = lang.keywords.matches(text).iter().count() as f64;
            let pattern_hits = lang.patterns.matches(text).iter().count() as f64;

            let keyword_density = keyword_hits / total_lines;
            let pattern_strength = pattern_hits / lang.pattern_count.max(1) as f64;

            let score = ((KEYWORD_WEIGHT * keyword_density + PATTERN_WEIGHT * pattern_strength)
                * lang.weight)
                .min(1.0);
            features.language_scores.insert(lang.name, round3(score));

            if best.is_none_or(|(_, s)| score > s) {
                best = Some((lang.name, score));
            }
        }

        // Structural scoring: capped per-marker densities.
        let mut structural_score = 0.0;
        for (name, re) in &self.structural {
            let density = re.find_iter(text).count() as f64 / total_lines;
            features.structural.insert(name, round3(density));
            structural_score += (density * MARKER_CAP).min(MARKER_CAP);
        }
        structural_score = structural_score.min(STRUCTURAL_CAP);

        let (best_lang, best_score) = best.unwrap_or(("", 0.0));
        let confidence =
            round3((LANGUAGE_MIX * best_score + STRUCTURAL_MIX * structural_score).min(1.0));
        features.final_confidence = confidence;

        let is_code = confidence >= self.threshold;
        let language = (is_code && best_score > LANGUAGE_LABEL_FLOOR).then_some(best_lang);

        CodeAnalysis {
            is_code,
            confidence,
            language,
            features,
        }
    }

    /// Run classification and wrap a positive result as a detection.
    ///
    /// Emits a single finding spanning the whole text, or nothing when the
    /// text does not classify as code.
    #[must_use]
    pub fn scan(&self, text: &str) -> Vec<Detection> {
        let analysis = self.analyze(text);
        if !analysis.is_code {
            return Vec::new();
        }

        let label = analysis.language.unwrap_or("unknown");
        let mut metadata = Metadata::new();
        metadata.insert(
            "language".to_owned(),
            serde_json::Value::String(label.to_owned()),
        );
        if let Ok(features) = serde_json::to_value(&analysis.features) {
            metadata.insert("features".to_owned(), features);
        }

        vec![Detection {
            kind: format!("source_code_{label}"),
            category: Category::SourceCode,
            severity: Severity::High,
            detector: DetectorKind::CodeClassifier,
            span: Detection::excerpt(text),
            start: 0,
            end: text.len(),
            confidence: analysis.confidence,
            metadata,
        }]
    }
}

impl Default for CodeClassifier {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const PYTHON_SNIPPET: &str = r#"
import os
from sys import path

class Loader:
    def __init__(self, root):
        self.root = root

    async def scan(self):
        for name in path:
            if name == self.root:
                return name
            elif name:
                yield name
        try:
            print(self.root)
        except ValueError:
            raise
        finally:
            pass

if __name__ == "__main__":
    Loader("demo")
"#;

    const SQL_SNIPPET: &str = "\
SELECT id, email FROM users WHERE active = 1;
INSERT INTO audit (id, action) VALUES (1, 'login');
CREATE TABLE sessions (id INT, token TEXT);
ALTER TABLE users ADD COLUMN flags INT;
SELECT token FROM sessions ORDER BY id;";

    const JS_SNIPPET: &str = "\
const fs = require('fs');
let count = 0;
var mode = typeof window;
function readAll(dir) {
    const entries = fs.readdirSync(dir);
    entries.forEach((e) => {
        console.log(e);
        count += 1;
    });
    return entries;
}
module.exports = { readAll };";

    fn classifier() -> CodeClassifier {
        CodeClassifier::with_defaults()
    }

    // 1. Trivially short input is never code
    #[test]
    fn short_input_not_code() {
        let analysis = classifier().analyze("x = 1");
        assert!(!analysis.is_code);
        assert_eq!(analysis.confidence, 0.0);
        assert_eq!(analysis.language, None);
    }

    // 2. Ordinary prose is not code
    #[test]
    fn prose_not_code() {
        let analysis = classifier().analyze(
            "Could you help me draft an email to the finance team about next \
             quarter's travel budget? It should be polite but firm.",
        );
        assert!(!analysis.is_code, "prose misclassified: {analysis:?}");
    }

    // 3. A Python module classifies as python
    #[test]
    fn python_classified() {
        let analysis = classifier().analyze(PYTHON_SNIPPET);
        assert!(analysis.is_code, "expected code, got {analysis:?}");
        assert!(analysis.confidence >= DEFAULT_CODE_THRESHOLD);
        assert_eq!(analysis.language, Some("python"));
    }

    // 4. SQL classifies as sql (boosted weight)
    #[test]
    fn sql_classified() {
        let analysis = classifier().analyze(SQL_SNIPPET);
        assert!(analysis.is_code, "expected code, got {analysis:?}");
        assert_eq!(analysis.language, Some("sql"));
    }

    // 5. JavaScript classifies as javascript
    #[test]
    fn javascript_classified() {
        let analysis = classifier().analyze(JS_SNIPPET);
        assert!(analysis.is_code, "expected code, got {analysis:?}");
        assert_eq!(analysis.language, Some("javascript"));
    }

    // 6. Confidence stays within [0, 1]
    #[test]
    fn confidence_in_range() {
        for sample in [PYTHON_SNIPPET, SQL_SNIPPET, JS_SNIPPET, "hello world, nothing here"] {
            let analysis = classifier().analyze(sample);
            assert!((0.0..=1.0).contains(&analysis.confidence));
        }
    }

    // 7. Features expose per-language and structural densities
    #[test]
    fn features_populated() {
        let analysis = classifier().analyze(PYTHON_SNIPPET);
        assert!(analysis.features.language_scores.contains_key("python"));
        assert!(analysis.features.structural.contains_key("indentation"));
        assert!((analysis.features.final_confidence - analysis.confidence).abs() < 1e-9);
    }

    // 8. scan wraps a positive classification as one detection
    #[test]
    fn scan_emits_detection() {
        let hits = classifier().scan(PYTHON_SNIPPET);
        assert_eq!(hits.len(), 1);
        let det = &hits[0];
        assert_eq!(det.kind, "source_code_python");
        assert_eq!(det.category, Category::SourceCode);
        assert_eq!(det.severity, Severity::High);
        assert_eq!(det.detector, DetectorKind::CodeClassifier);
        assert_eq!(det.start, 0);
        assert_eq!(det.end, PYTHON_SNIPPET.len());
        assert!(PYTHON_SNIPPET.starts_with(&det.span));
    }

    // 9. scan on prose emits nothing
    #[test]
    fn scan_on_prose_empty() {
        let hits = classifier().scan("Tell me a story about a lighthouse keeper and a storm.");
        assert!(hits.is_empty());
    }

    // 10. A strict threshold suppresses classification
    #[test]
    fn threshold_is_respected() {
        let strict = CodeClassifier::new(0.99);
        let analysis = strict.analyze(PYTHON_SNIPPET);
        assert!(!analysis.is_code);
        // The underlying confidence is unchanged by the threshold.
        assert!(analysis.confidence >= DEFAULT_CODE_THRESHOLD);
        assert_eq!(analysis.language, None);
    }
}
