//! Per-file run audit log.
//!
//! A `RunLogger` collects the step log and the output-artifact registry while
//! one file is processed. `finish` consumes it, so each run writes exactly one
//! `<base>_runlog.json` and the record cannot change afterwards.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ReviewOptions;
use crate::error::ReviewError;
use crate::models::{SourceUnit, StageName, StageResult, StageStatus, StepName, sha256_hex};

/// Current schema version for run records
pub const RUN_RECORD_VERSION: u32 = 1;

pub(crate) fn utc_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Logical type of a produced artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    SummaryJson,
    ClassificationJson,
    AnalysisJson,
    MarkdownReport,
    RefactorSource,
}

/// One entry of the chronological step log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    pub timestamp: String,
    pub name: StepName,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// A registered output file and its checksum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub kind: ArtifactKind,
    pub path: String,
    pub sha256: String,
}

/// Full audit trail of one file's run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub version: u32,
    pub started_at: String,
    pub input_file: String,
    pub model: String,
    pub input_sha256: String,
    pub flags: ReviewOptions,
    pub steps: Vec<StepEvent>,
    pub outputs: Vec<OutputArtifact>,
}

impl RunRecord {
    /// Whether any step failed
    pub fn failed(&self) -> bool {
        self.steps.iter().any(|s| s.status == StageStatus::Failed)
    }
}

#[derive(Debug)]
pub struct RunLogger {
    record: RunRecord,
}

impl RunLogger {
    pub fn new(source: &SourceUnit, options: &ReviewOptions) -> Self {
        Self {
            record: RunRecord {
                version: RUN_RECORD_VERSION,
                started_at: utc_timestamp(),
                input_file: source.path.display().to_string(),
                model: options
                    .model
                    .clone()
                    .unwrap_or_else(|| "DEFAULT".to_string()),
                input_sha256: source.sha256.clone(),
                flags: options.clone(),
                steps: Vec::new(),
                outputs: Vec::new(),
            },
        }
    }

    pub fn log_step(&mut self, name: impl Into<StepName>, status: StageStatus, extra: Option<Value>) {
        self.record.steps.push(StepEvent {
            timestamp: utc_timestamp(),
            name: name.into(),
            status,
            extra,
        });
    }

    /// Record a finished stage, noting when the correction pass was used
    pub fn log_result(&mut self, result: &StageResult) {
        let extra = result
            .corrected
            .then(|| serde_json::json!({ "corrected": true }));
        self.log_step(result.stage, result.status, extra);
    }

    pub fn log_failure(&mut self, name: impl Into<StepName>, error: &str) {
        self.log_step(
            name,
            StageStatus::Failed,
            Some(serde_json::json!({ "error": error })),
        );
    }

    /// Record a failed stage. Structured failures keep both raw replies.
    pub fn log_error(&mut self, stage: StageName, error: &ReviewError) {
        let mut extra = serde_json::json!({ "error": error.to_string() });
        if let Some((original_raw, corrected_raw)) = error.raw_outputs() {
            extra["original_raw"] = Value::from(original_raw);
            extra["corrected_raw"] = Value::from(corrected_raw);
        }
        self.log_step(stage, StageStatus::Failed, Some(extra));
    }

    /// Register an artifact. The checksum comes from `content` when given,
    /// otherwise from the file on disk.
    pub fn add_output(&mut self, kind: ArtifactKind, path: &Path, content: Option<&str>) -> Result<()> {
        let sha256 = match content {
            Some(text) => sha256_hex(text.as_bytes()),
            None => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read artifact for checksum: {:?}", path))?;
                sha256_hex(&bytes)
            }
        };

        self.record.outputs.push(OutputArtifact {
            kind,
            path: path.display().to_string(),
            sha256,
        });
        Ok(())
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Write `<base_name>_runlog.json` into `log_dir` and return the record
    pub fn finish(self, log_dir: &Path, base_name: &str) -> Result<(RunRecord, PathBuf)> {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

        let path = log_dir.join(format!("{}_runlog.json", base_name));
        let json = serde_json::to_string_pretty(&self.record).context("Failed to serialize run log")?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write run log: {:?}", path))?;

        Ok((self.record, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn logger() -> RunLogger {
        let source = SourceUnit::new("sql/pkg.sql", "BEGIN NULL; END;".to_string());
        RunLogger::new(&source, &ReviewOptions::default())
    }

    #[test]
    fn test_new_record() {
        let logger = logger();
        let record = logger.record();
        assert_eq!(record.version, 1);
        assert_eq!(record.model, "DEFAULT");
        assert_eq!(record.input_file, "sql/pkg.sql");
        assert_eq!(record.input_sha256.len(), 64);
        assert!(record.started_at.ends_with('Z'));
    }

    #[test]
    fn test_steps_are_chronological() {
        let mut logger = logger();
        logger.log_step(StageName::Summary, StageStatus::Started, None);
        logger.log_step(StageName::Summary, StageStatus::Success, None);
        logger.log_step(StageName::Classification, StageStatus::Skipped, None);
        logger.log_failure(StageName::Analysis, "analysis output is empty");

        let steps = &logger.record().steps;
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[2].status, StageStatus::Skipped);
        assert_eq!(steps[3].extra.as_ref().unwrap()["error"], "analysis output is empty");
        assert!(logger.record().failed());
    }

    #[test]
    fn test_structured_failure_keeps_raw_replies() {
        let mut logger = logger();
        let err = ReviewError::StructuredOutputInvalid {
            stage: StageName::Classification,
            original_error: "key must be a string".to_string(),
            correction_error: "EOF while parsing".to_string(),
            original_raw: "{RAW_ONE".to_string(),
            corrected_raw: "{RAW_TWO".to_string(),
        };
        logger.log_error(StageName::Classification, &err);
        logger.log_error(
            StageName::Summary,
            &ReviewError::EmptyOutput {
                stage: StageName::Summary,
            },
        );

        let steps = &logger.record().steps;
        let extra = steps[0].extra.as_ref().unwrap();
        assert_eq!(steps[0].name, StageName::Classification);
        assert_eq!(extra["original_raw"], "{RAW_ONE");
        assert_eq!(extra["corrected_raw"], "{RAW_TWO");
        assert!(extra["error"].as_str().unwrap().contains("still invalid JSON"));

        let extra = steps[1].extra.as_ref().unwrap();
        assert_eq!(extra["error"], "summary output is empty");
        assert!(extra.get("original_raw").is_none());
    }

    #[test]
    fn test_write_failure_step() {
        let mut logger = logger();
        logger.log_failure(StepName::Write, "Failed to create output directory");

        let raw = serde_json::to_value(logger.record()).unwrap();
        assert_eq!(raw["steps"][0]["name"], "write");
        assert_eq!(raw["steps"][0]["status"], "failed");
        assert!(logger.record().failed());
    }

    #[test]
    fn test_corrected_result_is_noted() {
        let mut logger = logger();
        let result = StageResult::structured(
            StageName::Analysis,
            "{}".to_string(),
            serde_json::json!({}),
            true,
        );
        logger.log_result(&result);
        assert_eq!(logger.record().steps[0].extra.as_ref().unwrap()["corrected"], true);
    }

    #[test]
    fn test_output_checksum_from_content_or_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a_summary.json");
        std::fs::write(&path, "abc").unwrap();

        let mut logger = logger();
        logger.add_output(ArtifactKind::SummaryJson, &path, Some("abc")).unwrap();
        logger.add_output(ArtifactKind::SummaryJson, &path, None).unwrap();

        let outputs = &logger.record().outputs;
        assert_eq!(outputs[0].sha256, outputs[1].sha256);

        let missing = dir.path().join("missing.md");
        assert!(logger.add_output(ArtifactKind::MarkdownReport, &missing, None).is_err());
    }

    #[test]
    fn test_finish_writes_runlog() {
        let dir = TempDir::new().unwrap();
        let mut logger = logger();
        logger.log_step(StageName::Summary, StageStatus::Success, None);

        let (record, path) = logger.finish(&dir.path().join("logs"), "pkg").unwrap();
        assert!(path.ends_with("pkg_runlog.json"));

        let written: RunRecord =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, record);

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["steps"][0]["name"], "summary");
        assert_eq!(raw["flags"]["no_markdown"], false);
    }
}
