use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Narrative summary (free text)
    Summary,
    /// Issues sorted into the seven fixed categories (structured)
    Classification,
    /// Summary, risks and assumptions (structured)
    Analysis,
    /// Behavior-preserving rewrite of the source (free text)
    Refactor,
    /// Deploy verdict over a CI log (structured)
    Gate,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Classification => "classification",
            Self::Analysis => "analysis",
            Self::Refactor => "refactor",
            Self::Gate => "gate",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subject of a run-log step: a pipeline stage, or writing the artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    Summary,
    Classification,
    Analysis,
    Refactor,
    Gate,
    /// Creating output directories and writing artifact files
    Write,
}

impl From<StageName> for StepName {
    fn from(stage: StageName) -> Self {
        match stage {
            StageName::Summary => Self::Summary,
            StageName::Classification => Self::Classification,
            StageName::Analysis => Self::Analysis,
            StageName::Refactor => Self::Refactor,
            StageName::Gate => Self::Gate,
        }
    }
}

impl PartialEq<StageName> for StepName {
    fn eq(&self, other: &StageName) -> bool {
        *self == Self::from(*other)
    }
}

/// Status of one stage as recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Started,
    Success,
    Skipped,
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Success => write!(f, "success"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one stage for one source file
#[derive(Debug, Clone)]
pub struct StageResult {
    pub stage: StageName,
    pub status: StageStatus,
    /// Trimmed reply text (the corrected reply when a correction pass ran)
    pub raw: String,
    /// Parsed document for structured stages
    pub parsed: Option<Value>,
    /// Whether the one-shot correction pass produced the parsed value
    pub corrected: bool,
}

impl StageResult {
    pub fn text(stage: StageName, raw: String) -> Self {
        Self {
            stage,
            status: StageStatus::Success,
            raw,
            parsed: None,
            corrected: false,
        }
    }

    pub fn structured(stage: StageName, raw: String, parsed: Value, corrected: bool) -> Self {
        Self {
            stage,
            status: StageStatus::Success,
            raw,
            parsed: Some(parsed),
            corrected,
        }
    }
}

/// A typed stage value together with the record of how it was produced
#[derive(Debug, Clone)]
pub struct StageOutcome<T> {
    pub value: T,
    pub result: StageResult,
}
