//! The built-in detection pattern catalogue and its validators.
//!
//! Each entry pairs a regex with a category, severity, baseline confidence,
//! and an optional [`Validator`] that re-checks the matched substring.  A
//! validator that rejects causes the match to be dropped silently — this is
//! the main false-positive control for checksummed identifiers (cards,
//! Aadhaar) and entropy-gated secrets.
//!
//! Confidences are part of the contract.  In particular `phone_number`
//! (0.60) and `indian_bank_account` (0.20) are intentionally broad,
//! low-confidence signals that exist to feed the aggregator's diversity
//! and severity boosts, not to stand alone.

use serde::{Deserialize, Serialize};

use crate::report::{Category, Severity};

use super::entropy::shannon_entropy;

// ── Validator ──────────────────────────────────────────────────────────

/// Post-match predicate run on the matched substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// Accept every match.
    #[default]
    None,
    /// Mod-10 checksum over the digits; rejects fewer than 13 digits.
    Luhn,
    /// Aadhaar shape: exactly 12 digits after separator stripping, first
    /// digit not 0 or 1.
    Aadhaar,
    /// PAN holder-type check: 4th character must be one of `ABCFGHLJPT`.
    Pan,
    /// US SSN allocation rules: area not 000/666/9xx, group not 00,
    /// serial not 0000.
    Ssn,
    /// At least 8 characters and Shannon entropy above 3.0 bits.
    HighEntropy,
}

impl Validator {
    /// Whether `matched` survives this validator.
    #[must_use]
    pub fn accepts(self, matched: &str) -> bool {
        match self {
            Self::None => true,
            Self::Luhn => luhn_check(matched),
            Self::Aadhaar => aadhaar_check(matched),
            Self::Pan => pan_check(matched),
            Self::Ssn => ssn_check(matched),
            Self::HighEntropy => high_entropy(matched),
        }
    }
}

fn luhn_check(matched: &str) -> bool {
    let digits: Vec<u32> = matched.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 {
        return false;
    }
    let mut sum = 0u32;
    for (i, &d) in digits.iter().rev().enumerate() {
        if i % 2 == 1 {
            let doubled = d * 2;
            sum += doubled / 10 + doubled % 10;
        } else {
            sum += d;
        }
    }
    sum % 10 == 0
}

fn aadhaar_check(matched: &str) -> bool {
    let digits: String = matched.chars().filter(char::is_ascii_digit).collect();
    digits.len() == 12 && !digits.starts_with('0') && !digits.starts_with('1')
}

fn pan_check(matched: &str) -> bool {
    matched
        .chars()
        .nth(3)
        .is_some_and(|c| "ABCFGHLJPT".contains(c))
}

fn ssn_check(matched: &str) -> bool {
    let mut parts = matched.split('-');
    let (Some(area), Some(group), Some(serial), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    !(area == "000" || area == "666" || area.starts_with('9') || group == "00" || serial == "0000")
}

fn high_entropy(matched: &str) -> bool {
    matched.chars().count() >= 8 && shannon_entropy(matched) > 3.0
}

// ── Built-in catalogue ─────────────────────────────────────────────────

/// A single entry of the built-in catalogue.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinPattern {
    /// Stable pattern name, used as the detection `type`.
    pub name: &'static str,
    /// Regex source, compiled once at engine construction.
    pub regex: &'static str,
    /// Artifact category the pattern detects.
    pub category: Category,
    /// Severity attached to matches.
    pub severity: Severity,
    /// Baseline confidence attached to matches.
    pub confidence: f64,
    /// Post-match predicate.
    pub validator: Validator,
    /// Human-readable description, copied into detection metadata.
    pub description: &'static str,
}

/// The full built-in catalogue, in emission order.
pub const BUILTIN_PATTERNS: &[BuiltinPattern] = &[
    // ── PII ──
    BuiltinPattern {
        name: "aadhaar_number",
        regex: r"\b[2-9]\d{3}[\s-]?\d{4}[\s-]?\d{4}\b",
        category: Category::Pii,
        severity: Severity::Critical,
        confidence: 0.85,
        validator: Validator::Aadhaar,
        description: "Indian Aadhaar number (12 digits)",
    },
    BuiltinPattern {
        name: "pan_number",
        regex: r"\b[A-Z]{5}\d{4}[A-Z]\b",
        category: Category::Pii,
        severity: Severity::High,
        confidence: 0.90,
        validator: Validator::Pan,
        description: "Indian PAN card number",
    },
    BuiltinPattern {
        name: "ssn",
        // Allocation exclusions (000/666/9xx area, 00 group, 0000 serial)
        // live in the validator; the regex only fixes the shape.
        regex: r"\b\d{3}-\d{2}-\d{4}\b",
        category: Category::Pii,
        severity: Severity::Critical,
        confidence: 0.90,
        validator: Validator::Ssn,
        description: "US Social Security Number",
    },
    BuiltinPattern {
        name: "email_address",
        regex: r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        category: Category::Pii,
        severity: Severity::Medium,
        confidence: 0.95,
        validator: Validator::None,
        description: "Email address",
    },
    BuiltinPattern {
        name: "phone_number",
        regex: r"\b(?:\+?1[-.\s]?)?(?:\(?\d{3}\)?[-.\s]?)?\d{3}[-.\s]?\d{4}\b",
        category: Category::Pii,
        severity: Severity::Medium,
        confidence: 0.60,
        validator: Validator::None,
        description: "US/IN phone number",
    },
    BuiltinPattern {
        name: "indian_phone",
        regex: r"\b(?:\+91[-.\s]?)?[6-9]\d{4}[-.\s]?\d{5}\b",
        category: Category::Pii,
        severity: Severity::Medium,
        confidence: 0.75,
        validator: Validator::None,
        description: "Indian mobile number",
    },
    // ── API keys & tokens ──
    BuiltinPattern {
        name: "openai_api_key",
        regex: r"\bsk-[a-zA-Z0-9]{20,}\b",
        category: Category::ApiKey,
        severity: Severity::Critical,
        confidence: 0.95,
        validator: Validator::None,
        description: "OpenAI API key",
    },
    BuiltinPattern {
        name: "aws_access_key",
        regex: r"\bAKIA[0-9A-Z]{16}\b",
        category: Category::ApiKey,
        severity: Severity::Critical,
        confidence: 0.95,
        validator: Validator::None,
        description: "AWS Access Key ID",
    },
    BuiltinPattern {
        name: "aws_secret_key",
        regex: r"\b[A-Za-z0-9/+=]{40}\b",
        category: Category::ApiKey,
        severity: Severity::Critical,
        confidence: 0.50,
        validator: Validator::HighEntropy,
        description: "AWS Secret Access Key (high-entropy 40-char)",
    },
    BuiltinPattern {
        name: "github_token",
        regex: r"\b(?:ghp|gho|ghu|ghs|ghr)_[a-zA-Z0-9]{36,}\b",
        category: Category::ApiKey,
        severity: Severity::Critical,
        confidence: 0.95,
        validator: Validator::None,
        description: "GitHub personal/OAuth token",
    },
    BuiltinPattern {
        name: "slack_token",
        regex: r"\bxox[bpras]-[a-zA-Z0-9-]{10,}\b",
        category: Category::ApiKey,
        severity: Severity::High,
        confidence: 0.95,
        validator: Validator::None,
        description: "Slack API token",
    },
    BuiltinPattern {
        name: "google_api_key",
        regex: r"\bAIza[0-9A-Za-z_-]{35}\b",
        category: Category::ApiKey,
        severity: Severity::High,
        confidence: 0.90,
        validator: Validator::None,
        description: "Google API key",
    },
    BuiltinPattern {
        name: "stripe_key",
        regex: r"\b[sr]k_(?:live|test)_[a-zA-Z0-9]{20,}\b",
        category: Category::ApiKey,
        severity: Severity::Critical,
        confidence: 0.95,
        validator: Validator::None,
        description: "Stripe API key",
    },
    BuiltinPattern {
        name: "jwt_token",
        regex: r"\beyJ[a-zA-Z0-9_-]*\.eyJ[a-zA-Z0-9_-]*\.[a-zA-Z0-9_-]+\b",
        category: Category::Token,
        severity: Severity::High,
        confidence: 0.95,
        validator: Validator::None,
        description: "JSON Web Token",
    },
    BuiltinPattern {
        name: "bearer_token",
        regex: r#"(?i)(?:bearer|token|authorization)[\s:=]+['"]?([a-zA-Z0-9_\-.]{20,})['"]?"#,
        category: Category::Token,
        severity: Severity::High,
        confidence: 0.70,
        validator: Validator::None,
        description: "Bearer/Authorization token in header",
    },
    // ── Database connection strings ──
    BuiltinPattern {
        name: "postgres_connection",
        regex: r#"(?i)postgres(?:ql)?://[^\s'"]{10,}"#,
        category: Category::DbConnection,
        severity: Severity::Critical,
        confidence: 0.95,
        validator: Validator::None,
        description: "PostgreSQL connection string",
    },
    BuiltinPattern {
        name: "mysql_connection",
        regex: r#"(?i)mysql(?:\+\w+)?://[^\s'"]{10,}"#,
        category: Category::DbConnection,
        severity: Severity::Critical,
        confidence: 0.95,
        validator: Validator::None,
        description: "MySQL connection string",
    },
    BuiltinPattern {
        name: "mongodb_connection",
        regex: r#"(?i)mongodb(?:\+srv)?://[^\s'"]{10,}"#,
        category: Category::DbConnection,
        severity: Severity::Critical,
        confidence: 0.95,
        validator: Validator::None,
        description: "MongoDB connection string",
    },
    BuiltinPattern {
        name: "redis_connection",
        regex: r#"(?i)redis://[^\s'"]{5,}"#,
        category: Category::DbConnection,
        severity: Severity::High,
        confidence: 0.90,
        validator: Validator::None,
        description: "Redis connection string",
    },
    BuiltinPattern {
        name: "generic_connection_string",
        regex: r"(?i)(?:Data Source|Server|Host)=[^;]+;(?:.*?(?:Password|Pwd)=[^;]+)",
        category: Category::DbConnection,
        severity: Severity::Critical,
        confidence: 0.85,
        validator: Validator::None,
        description: "ADO.NET / ODBC connection string with password",
    },
    // ── Internal URLs / private IPs ──
    BuiltinPattern {
        name: "private_ipv4",
        regex: r"\b(?:10\.\d{1,3}\.\d{1,3}\.\d{1,3}|172\.(?:1[6-9]|2\d|3[01])\.\d{1,3}\.\d{1,3}|192\.168\.\d{1,3}\.\d{1,3})\b",
        category: Category::InternalUrl,
        severity: Severity::Medium,
        confidence: 0.80,
        validator: Validator::None,
        description: "RFC1918 private IPv4 address",
    },
    BuiltinPattern {
        name: "internal_url",
        regex: r"(?i)https?://[a-z0-9.-]*\.(?:internal|corp|local|intranet|private|staging|dev)\b[^\s]*",
        category: Category::InternalUrl,
        severity: Severity::High,
        confidence: 0.90,
        validator: Validator::None,
        description: "Internal/corporate URL",
    },
    // ── Financial ──
    BuiltinPattern {
        name: "credit_card",
        regex: r"\b(?:4\d{3}|5[1-5]\d{2}|3[47]\d{2}|6(?:011|5\d{2}))[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{3,4}\b",
        category: Category::Financial,
        severity: Severity::Critical,
        confidence: 0.85,
        validator: Validator::Luhn,
        description: "Credit/debit card number",
    },
    BuiltinPattern {
        name: "iban",
        regex: r"\b[A-Z]{2}\d{2}[A-Z0-9]{4}\d{7}(?:[A-Z0-9]?\d{0,16})\b",
        category: Category::Financial,
        severity: Severity::High,
        confidence: 0.80,
        validator: Validator::None,
        description: "International Bank Account Number",
    },
    BuiltinPattern {
        name: "indian_bank_account",
        // Very broad; consumers rely on the low confidence.
        regex: r"\b\d{9,18}\b",
        category: Category::Financial,
        severity: Severity::Low,
        confidence: 0.20,
        validator: Validator::None,
        description: "Potential Indian bank account number (needs context)",
    },
    // ── Credentials ──
    BuiltinPattern {
        name: "password_in_text",
        regex: r#"(?i)(?:password|passwd|pwd|secret|token)[\s]*[:=]\s*['"]?([^\s'"]{8,})['"]?"#,
        category: Category::Credential,
        severity: Severity::Critical,
        confidence: 0.80,
        validator: Validator::None,
        description: "Password or secret in plaintext assignment",
    },
    BuiltinPattern {
        name: "private_key_header",
        regex: r"-----BEGIN (?:RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----",
        category: Category::Credential,
        severity: Severity::Critical,
        confidence: 0.99,
        validator: Validator::None,
        description: "Private key PEM header",
    },
];

// ── CustomPattern ──────────────────────────────────────────────────────

/// A user-supplied pattern, appended to the built-in catalogue at engine
/// construction.  Custom patterns can never shadow a built-in by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CustomPattern {
    /// Stable pattern name, used as the detection `type`.
    pub name: String,
    /// Regex source.
    pub regex: String,
    /// Artifact category.
    pub category: Category,
    /// Severity attached to matches.
    pub severity: Severity,
    /// Baseline confidence attached to matches (0.0–1.0).
    pub confidence: f64,
    /// Optional post-match predicate.
    #[serde(default)]
    pub validator: Validator,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

// ── Tests ──────────────────────────────────────────────────────────────
