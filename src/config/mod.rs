//! Detection configuration snapshot.
//!
//! [`DetectionConfig`] is captured once at pipeline construction and never
//! mutated afterwards — reconfiguring means building a new pipeline and
//! swapping it in.  Values can come from compiled defaults, a TOML or JSON
//! file, or be assembled programmatically; everything is validated before
//! use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::report::DetectorKind;

// ── ConfigError ────────────────────────────────────────────────────────

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read config file at {path}: {source}")]
    FileRead {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse configuration content.
    #[error("failed to parse {format} config: {source}")]
    Parse {
        /// Format that failed to parse (TOML or JSON).
        format: &'static str,
        /// Underlying parse error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Unsupported or unrecognised configuration file extension.
    #[error("unsupported config file format: {message}")]
    UnsupportedFormat {
        /// Description of the problem.
        message: String,
    },

    /// Field-level validation failed.
    #[error("config validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The warn threshold exceeds the block threshold.
    #[error("warn threshold {warn} must not exceed block threshold {block}")]
    ThresholdOrder {
        /// Configured warn threshold.
        warn: f64,
        /// Configured block threshold.
        block: f64,
    },
}

// ── DetectorWeights ────────────────────────────────────────────────────

/// Per-detector weights for score aggregation.
///
/// Weights are relative: the aggregator divides by the sum of weights of
/// the detector groups actually present, so they need not sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case", default)]
pub struct DetectorWeights {
    /// Weight of the regex pattern engine.
    #[validate(range(min = 0.0, max = 1.0))]
    pub regex: f64,
    /// Weight of the (reserved) NER detector.
    #[validate(range(min = 0.0, max = 1.0))]
    pub ner: f64,
    /// Weight of the code classifier.
    #[validate(range(min = 0.0, max = 1.0))]
    pub code_classifier: f64,
    /// Weight of the (reserved) fingerprint detector.
    #[validate(range(min = 0.0, max = 1.0))]
    pub fingerprint: f64,
    /// Weight of the (reserved) LLM classifier.
    #[validate(range(min = 0.0, max = 1.0))]
    pub llm_classifier: f64,
    /// Weight applied to any detector not listed above.
    #[validate(range(min = 0.0, max = 1.0))]
    pub fallback: f64,
}

impl Default for DetectorWeights {
    fn default() -> Self {
        Self {
            regex: 0.30,
            ner: 0.25,
            code_classifier: 0.20,
            fingerprint: 0.15,
            llm_classifier: 0.10,
            fallback: 0.10,
        }
    }
}

impl DetectorWeights {
    /// Dense weight lookup for a detector.
    #[must_use]
    pub fn weight_for(&self, kind: &DetectorKind) -> f64 {
        match kind {
            DetectorKind::Regex => self.regex,
            DetectorKind::Ner => self.ner,
            DetectorKind::CodeClassifier => self.code_classifier,
            DetectorKind::Fingerprint => self.fingerprint,
            DetectorKind::LlmClassifier => self.llm_classifier,
            DetectorKind::Custom(_) => self.fallback,
        }
    }
}

// ── DetectionConfig ────────────────────────────────────────────────────

fn default_warn_threshold() -> f64 {
    0.30
}
fn default_block_threshold() -> f64 {
    0.70
}
fn default_max_prompt_size() -> usize {
    102_400
}

/// Immutable configuration snapshot for a detection pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct DetectionConfig {
    /// Risk score at or above which a prompt is flagged WARN.
    #[serde(default = "default_warn_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub score_threshold_warn: f64,

    /// Risk score at or above which a prompt is BLOCKed.
    #[serde(default = "default_block_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub score_threshold_block: f64,

    /// Per-detector aggregation weights.
    #[serde(default)]
    #[validate(nested)]
    pub weights: DetectorWeights,

    /// Byte budget the caller enforces before invoking the pipeline.
    #[serde(default = "default_max_prompt_size")]
    pub max_prompt_size_bytes: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            score_threshold_warn: default_warn_threshold(),
            score_threshold_block: default_block_threshold(),
            weights: DetectorWeights::default(),
            max_prompt_size_bytes: default_max_prompt_size(),
        }
    }
}

impl DetectionConfig {
    /// Load a configuration from a TOML or JSON file (by extension).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| ConfigError::Parse {
                format: "TOML",
                source: Box::new(e),
            })?,
            Some("json") => serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                format: "JSON",
                source: Box::new(e),
            })?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    message: "file extension must be .toml or .json".to_owned(),
                });
            }
        };

        config.ensure_valid()?;
        Ok(config)
    }

    /// Validate field ranges and the threshold ordering.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for out-of-range fields and
    /// [`ConfigError::ThresholdOrder`] when `warn > block`.
    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.score_threshold_warn > self.score_threshold_block {
            return Err(ConfigError::ThresholdOrder {
                warn: self.score_threshold_warn,
                block: self.score_threshold_block,
            });
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
