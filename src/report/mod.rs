//! Value types emitted by the detection pipeline.
//!
//! Every type here is a plain value: created during a single scan, immutable
//! once emitted, owned by the caller.  The wire layer (out of scope for this
//! crate) serializes them directly — field names and case match the gateway
//! response schema.

use serde::{Deserialize, Serialize};

// ── Severity ───────────────────────────────────────────────────────────

/// Severity of a detected artifact.
///
/// Ordered from lowest to highest — `Ord` is derived so that comparisons
/// like `severity >= Severity::High` work naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Low risk — noisy signals that only matter in aggregate.
    Low,
    /// Medium risk — worth surfacing, rarely blocks alone.
    Medium,
    /// High risk — should block under default thresholds.
    High,
    /// Critical — credential-grade material.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

// ── Category ───────────────────────────────────────────────────────────

/// Kind of sensitive artifact a detection refers to.
///
/// A closed tag set — extending it requires recompilation.  User-supplied
/// patterns pick one of these tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum Category {
    /// Personal identifiers (Aadhaar, PAN, SSN, email, phone).
    Pii,
    /// Provider API keys (OpenAI, AWS, GitHub, Slack, Google, Stripe).
    ApiKey,
    /// Bearer/JWT style tokens.
    Token,
    /// Database connection strings.
    DbConnection,
    /// Source code pasted into a prompt.
    SourceCode,
    /// Private network references and internal hostnames.
    InternalUrl,
    /// Financial identifiers (cards, IBANs, account numbers).
    Financial,
    /// Passwords, secrets, private key material.
    Credential,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pii => write!(f, "PII"),
            Self::ApiKey => write!(f, "API_KEY"),
            Self::Token => write!(f, "TOKEN"),
            Self::DbConnection => write!(f, "DB_CONNECTION"),
            Self::SourceCode => write!(f, "SOURCE_CODE"),
            Self::InternalUrl => write!(f, "INTERNAL_URL"),
            Self::Financial => write!(f, "FINANCIAL"),
            Self::Credential => write!(f, "CREDENTIAL"),
        }
    }
}

// ── DetectorKind ───────────────────────────────────────────────────────

/// Which detector produced a finding.
///
/// Modeled as a closed variant set rather than free-form strings so the
/// aggregator's weight table is a dense lookup.  `Ner`, `Fingerprint` and
/// `LlmClassifier` are reserved slots: no built-in stage emits them, but
/// their weights are honored if an embedder injects such detections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    /// The compiled pattern catalogue.
    Regex,
    /// The heuristic source-code classifier.
    CodeClassifier,
    /// Reserved: named-entity recognition.
    Ner,
    /// Reserved: document fingerprinting.
    Fingerprint,
    /// Reserved: learned classifier.
    LlmClassifier,
    /// Any other detector; scored with the fallback weight.
    Custom(String),
}

impl DetectorKind {
    /// Stable string form used on the wire and in weight configuration.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Regex => "regex",
            Self::CodeClassifier => "code_classifier",
            Self::Ner => "ner",
            Self::Fingerprint => "fingerprint",
            Self::LlmClassifier => "llm_classifier",
            Self::Custom(name) => name,
        }
    }

    /// Parse the wire form back into a variant.  Unknown names become
    /// [`DetectorKind::Custom`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "regex" => Self::Regex,
            "code_classifier" => Self::CodeClassifier,
            "ner" => Self::Ner,
            "fingerprint" => Self::Fingerprint,
            "llm_classifier" => Self::LlmClassifier,
            other => Self::Custom(other.to_owned()),
        }
    }
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DetectorKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DetectorKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

// ── Action ─────────────────────────────────────────────────────────────

/// Gateway verdict for a scanned prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Pass the prompt through unchanged.
    Allow,
    /// Pass with a notice to the user.
    Warn,
    /// Refuse the upstream send.
    Block,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allow => write!(f, "ALLOW"),
            Self::Warn => write!(f, "WARN"),
            Self::Block => write!(f, "BLOCK"),
        }
    }
}

// ── Detection ──────────────────────────────────────────────────────────

/// Free-form metadata bag attached to a detection.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Maximum number of span characters kept on a detection.
pub(crate) const SPAN_EXCERPT_CHARS: usize = 100;

/// A single finding produced by one detector.
///
/// Invariants (upheld by the emitting detectors, debug-asserted here):
/// `start <= end <= len(scanned_text)`, `0.0 <= confidence <= 1.0`, and
/// `span` is a prefix of the matched substring (truncated to 100 chars).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Pattern or detector-specific type label (e.g. `aws_access_key`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Artifact category.
    pub category: Category,
    /// Severity inherited from the pattern or stage.
    pub severity: Severity,
    /// Which detector produced this finding.
    pub detector: DetectorKind,
    /// Excerpt of the matched text, truncated to 100 characters.
    pub span: String,
    /// Start byte offset relative to the text that was scanned.
    pub start: usize,
    /// End byte offset relative to the text that was scanned.
    pub end: usize,
    /// Confidence attached to this finding (0.0–1.0).
    pub confidence: f64,
    /// Extra detector-specific context (description, language scores, …).
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Detection {
    /// Truncate `matched` to the span excerpt length.
    pub(crate) fn excerpt(matched: &str) -> String {
        matched.chars().take(SPAN_EXCERPT_CHARS).collect()
    }
}

// ── DecodingReport ─────────────────────────────────────────────────────

/// Outcome of the de-obfuscation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodingReport {
    /// The text as submitted.
    pub original: String,
    /// The text after all decoding passes.
    pub decoded: String,
    /// Ordered labels of every transformation that changed the text,
    /// e.g. `pass1:base64_decode`.
    pub transformations: Vec<String>,
    /// Shannon entropy of the original text (bits per character).
    pub entropy_original: f64,
    /// Shannon entropy of the decoded text.
    pub entropy_decoded: f64,
    /// `true` iff any transformation fired.
    pub was_encoded: bool,
}

// ── CodeAnalysis ───────────────────────────────────────────────────────

/// Sub-scores computed by the code classifier, surfaced for audit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CodeFeatures {
    /// Per-language heuristic scores.
    pub language_scores: std::collections::BTreeMap<&'static str, f64>,
    /// Per-marker structural densities (matches per line).
    pub structural: std::collections::BTreeMap<&'static str, f64>,
    /// The combined confidence before thresholding.
    pub final_confidence: f64,
}

/// Result of heuristic source-code classification.
#[derive(Debug, Clone, Serialize)]
pub struct CodeAnalysis {
    /// Whether the text clears the code-confidence threshold.
    pub is_code: bool,
    /// Combined classifier confidence (0.0–1.0).
    pub confidence: f64,
    /// Best language guess, present only for confident classifications.
    pub language: Option<&'static str>,
    /// Sub-scores that produced the confidence.
    pub features: CodeFeatures,
}

impl CodeAnalysis {
    /// The not-code analysis returned for trivially short input.
    #[must_use]
    pub fn not_code() -> Self {
        Self {
            is_code: false,
            confidence: 0.0,
            language: None,
            features: CodeFeatures::default(),
        }
    }
}

// ── ScanResult ─────────────────────────────────────────────────────────

/// Complete result of one pipeline scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Fused risk score, rounded to four decimal places (0.0–1.0).
    pub risk_score: f64,
    /// Verdict mapped from the risk score via configured thresholds.
    pub action: Action,
    /// Findings in stable order: catalogue hits on the decoded text,
    /// then original-only hits, then the code classifier.
    pub detections: Vec<Detection>,
    /// De-obfuscation details for the scanned prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoding: Option<DecodingReport>,
    /// SHA-256 hex digest of the original prompt bytes.
    pub prompt_hash: String,
    /// Wall-clock scan latency in integer milliseconds.
    pub latency_ms: u64,
    /// Name of a matched policy.  Reserved — always `None` in the core.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_matched: Option<String>,
}

/// How many detection type labels a block message lists.
const MESSAGE_TYPE_LIMIT: usize = 5;

impl ScanResult {
    /// User-facing message for the gateway response.
    ///
    /// `BLOCK` lists up to five detected type labels plus a remediation
    /// hint, `WARN` is a generic caution, `ALLOW` is empty.
    #[must_use]
    pub fn message(&self) -> String {
        match self.action {
            Action::Allow => String::new(),
            Action::Warn => {
                "Potentially sensitive content detected; review before sending.".to_owned()
            }
            Action::Block => {
                let mut labels: Vec<&str> = Vec::new();
                for det in &self.detections {
                    if !labels.contains(&det.kind.as_str()) {
                        labels.push(&det.kind);
                    }
                    if labels.len() == MESSAGE_TYPE_LIMIT {
                        break;
                    }
                }
                format!(
                    "Prompt blocked: sensitive content detected ({}). \
                     Remove the flagged material and try again.",
                    labels.join(", ")
                )
            }
        }
    }

    /// The subset of fields persisted to the audit log.
    #[must_use]
    pub fn audit_record(&self) -> AuditRecord<'_> {
        AuditRecord {
            action: self.action,
            risk_score: self.risk_score,
            detections: &self.detections,
            prompt_hash: &self.prompt_hash,
            latency_ms: self.latency_ms,
        }
    }
}

/// Borrowing projection of a [`ScanResult`] for audit persistence.
#[derive(Debug, Serialize)]
pub struct AuditRecord<'a> {
    /// Verdict for the scan.
    pub action: Action,
    /// Fused risk score.
    pub risk_score: f64,
    /// All findings, serialized in emission order.
    pub detections: &'a [Detection],
    /// SHA-256 hex digest of the prompt.
    pub prompt_hash: &'a str,
    /// Scan latency in milliseconds.
    pub latency_ms: u64,
}

// ── Tests ──────────────────────────────────────────────────────────────
