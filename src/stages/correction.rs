//! One-shot correction of malformed structured replies.
//!
//! ```text
//! start(raw) ──ok──▶ Parsed
//!     │
//!     └─err──▶ CorrectionRequested ──resolve(fixed)──ok──▶ Parsed
//!                                         └──────────err──▶ Failed
//! ```
//!
//! `resolve` leaves terminal states untouched and never loops, so a structured
//! stage parses at most twice.

use serde_json::Value;

use crate::error::ReviewError;
use crate::models::StageName;

/// Parse a structured reply
pub fn parse_structured(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(raw.trim())
}

#[derive(Debug, Clone, PartialEq)]
pub enum CorrectionState {
    /// Terminal: a parse succeeded
    Parsed {
        value: Value,
        raw: String,
        corrected: bool,
    },
    /// The first parse failed; a correction pass is owed
    CorrectionRequested { raw: String, error: String },
    /// Terminal: the corrected reply failed to parse as well
    Failed {
        original_raw: String,
        original_error: String,
        corrected_raw: String,
        correction_error: String,
    },
}

impl CorrectionState {
    /// First parse attempt
    pub fn start(raw: &str) -> Self {
        match parse_structured(raw) {
            Ok(value) => Self::Parsed {
                value,
                raw: raw.to_string(),
                corrected: false,
            },
            Err(e) => Self::CorrectionRequested {
                raw: raw.to_string(),
                error: e.to_string(),
            },
        }
    }

    /// Second and last parse attempt, over the corrected reply.
    ///
    /// Terminal states are returned unchanged.
    pub fn resolve(self, corrected_raw: &str) -> Self {
        match self {
            Self::CorrectionRequested { raw, error } => match parse_structured(corrected_raw) {
                Ok(value) => Self::Parsed {
                    value,
                    raw: corrected_raw.to_string(),
                    corrected: true,
                },
                Err(e) => Self::Failed {
                    original_raw: raw,
                    original_error: error,
                    corrected_raw: corrected_raw.to_string(),
                    correction_error: e.to_string(),
                },
            },
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::CorrectionRequested { .. })
    }

    /// Number of parse attempts that led to this state
    pub fn parse_attempts(&self) -> u8 {
        match self {
            Self::Parsed {
                corrected: false, ..
            } => 1,
            Self::CorrectionRequested { .. } => 1,
            Self::Parsed { corrected: true, .. } | Self::Failed { .. } => 2,
        }
    }

    /// Convert a terminal state into the parsed value and its source text
    pub fn finish(self, stage: StageName) -> Result<(Value, String, bool), ReviewError> {
        match self {
            Self::Parsed {
                value,
                raw,
                corrected,
            } => Ok((value, raw, corrected)),
            Self::Failed {
                original_raw,
                original_error,
                corrected_raw,
                correction_error,
            } => Err(ReviewError::StructuredOutputInvalid {
                stage,
                original_error,
                correction_error,
                original_raw,
                corrected_raw,
            }),
            Self::CorrectionRequested { raw, error } => Err(ReviewError::StructuredOutputInvalid {
                stage,
                original_error: error,
                correction_error: "correction pass was not performed".to_string(),
                original_raw: raw,
                corrected_raw: String::new(),
            }),
        }
    }
}
