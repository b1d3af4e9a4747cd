use serde::{Deserialize, Serialize};

use super::{Issue, Severity};

/// Aggregated view of one successfully reviewed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResult {
    pub path: String,
    pub risk_score: u32,
    pub summary: String,
    pub issues: Vec<Issue>,
    pub refactor_suggestions: Vec<String>,
    pub checklist_items: Vec<String>,
}

/// A high or critical issue surfaced at run level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlag {
    pub file: String,
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

/// Run-level rollup written as `summary.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSummary {
    pub run_id: String,
    pub timestamp_utc: String,
    pub scanned_files: usize,
    pub overall_risk_score: u32,
    pub red_flags: Vec<RedFlag>,
    pub files: Vec<FileResult>,
    pub checklist: Vec<String>,
}
