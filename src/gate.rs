//! Deploy gate over CI logs.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::error::ReviewError;
use crate::io::{run_log::utc_timestamp, write_json};
use crate::llm::CompletionService;
use crate::models::GateVerdict;
use crate::pipeline::default_run_id;
use crate::stages::run_gate_stage;

/// Document written as `ci_gate.json`
#[derive(Debug, Clone, Serialize)]
pub struct GateReport {
    pub run_id: String,
    pub deploy_ok: bool,
    pub severity: String,
    pub reasons: Vec<String>,
    pub timestamp_utc: String,
}

/// Evaluate a CI log and optionally persist the verdict
pub async fn run_gate<S: CompletionService>(
    service: &S,
    log_file: &Path,
    run_id: Option<String>,
    output_dir: Option<&Path>,
) -> Result<(GateReport, Option<PathBuf>)> {
    if !log_file.is_file() {
        return Err(ReviewError::MissingInput(log_file.to_path_buf()).into());
    }

    let bytes = std::fs::read(log_file).map_err(|e| ReviewError::io(log_file, e))?;
    let log_text = String::from_utf8_lossy(&bytes);
    let run_id = run_id.unwrap_or_else(default_run_id);

    info!("Evaluating CI log {:?} (run {})", log_file, run_id);
    let GateVerdict {
        deploy_ok,
        reasons,
        severity,
    } = run_gate_stage(service, &log_text).await?.value;

    let report = GateReport {
        run_id,
        deploy_ok,
        severity,
        reasons,
        timestamp_utc: utc_timestamp(),
    };

    let written = match output_dir {
        Some(dir) => {
            let path = dir.join("ci_gate.json");
            write_json(&path, &report)?;
            Some(path)
        }
        None => None,
    };

    Ok((report, written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::executor::testing::ScriptedService;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_gate_blocks_and_writes_report() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("ci.log");
        std::fs::write(&log, b"ORA-00942: table or view does not exist\n\xff").unwrap();

        let service = ScriptedService::new([
            r#"{"deploy_ok": false, "reasons": ["ORA-00942 during deploy"], "severity": "high"}"#,
        ]);

        let (report, written) = run_gate(
            &service,
            &log,
            Some("ci-42".to_string()),
            Some(&dir.path().join("gate")),
        )
        .await
        .unwrap();

        assert!(!report.deploy_ok);
        assert_eq!(report.run_id, "ci-42");

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(written.unwrap()).unwrap()).unwrap();
        assert_eq!(json["severity"], "high");
        assert_eq!(json["reasons"][0], "ORA-00942 during deploy");

        let requests = service.requests.lock().unwrap();
        assert!(requests[0].user.contains("ORA-00942"));
    }

    #[tokio::test]
    async fn test_gate_missing_log() {
        let dir = TempDir::new().unwrap();
        let service = ScriptedService::new(Vec::<String>::new());
        let err = run_gate(&service, &dir.path().join("none.log"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReviewError>(),
            Some(ReviewError::MissingInput(_))
        ));
    }
}
