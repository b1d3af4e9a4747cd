use std::path::PathBuf;

use thiserror::Error;

use crate::models::StageName;

/// Failures raised while reviewing a single file.
///
/// `MissingInput` is fatal at start-up. Every other variant fails only the
/// file being processed; the directory orchestrator logs it and moves on.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("input path does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("{stage} output is empty")]
    EmptyOutput { stage: StageName },

    #[error(
        "{stage} output is still invalid JSON after correction (original error: {original_error}; correction error: {correction_error})"
    )]
    StructuredOutputInvalid {
        stage: StageName,
        original_error: String,
        correction_error: String,
        original_raw: String,
        corrected_raw: String,
    },

    #[error("{stage} output violates its schema: {reason}")]
    SchemaViolation { stage: StageName, reason: String },

    #[error("{stage} request failed: {source:#}")]
    Service {
        stage: StageName,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReviewError {
    pub fn schema(stage: StageName, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            stage,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Both raw replies of a structured failure: original, then corrected
    pub fn raw_outputs(&self) -> Option<(&str, &str)> {
        match self {
            Self::StructuredOutputInvalid {
                original_raw,
                corrected_raw,
                ..
            } => Some((original_raw, corrected_raw)),
            _ => None,
        }
    }

    /// Full diagnostic text, including raw replies for structured failures.
    pub fn diagnostic(&self) -> String {
        match self.raw_outputs() {
            Some((original_raw, corrected_raw)) => format!(
                "{self}\nOriginal output:\n{original_raw}\n\nCorrected output:\n{corrected_raw}"
            ),
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_diagnostic_includes_both_raw_texts() {
        let err = ReviewError::StructuredOutputInvalid {
            stage: StageName::Analysis,
            original_error: "expected value".to_string(),
            correction_error: "trailing comma".to_string(),
            original_raw: "{oops".to_string(),
            corrected_raw: "{still oops,}".to_string(),
        };

        let text = err.diagnostic();
        assert!(text.contains("analysis output is still invalid JSON"));
        assert!(text.contains("{oops"));
        assert!(text.contains("{still oops,}"));
    }

    #[test]
    fn test_raw_outputs_only_for_structured_failures() {
        let err = ReviewError::StructuredOutputInvalid {
            stage: StageName::Gate,
            original_error: "e1".to_string(),
            correction_error: "e2".to_string(),
            original_raw: "{a".to_string(),
            corrected_raw: "{b".to_string(),
        };
        assert_eq!(err.raw_outputs(), Some(("{a", "{b")));

        let err = ReviewError::EmptyOutput {
            stage: StageName::Summary,
        };
        assert_eq!(err.raw_outputs(), None);
        assert_eq!(err.diagnostic(), err.to_string());
    }

    #[test]
    fn test_missing_input_message() {
        let err = ReviewError::MissingInput(PathBuf::from("/nope/src"));
        assert_eq!(err.to_string(), "input path does not exist: /nope/src");
    }
}
