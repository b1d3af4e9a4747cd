use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use super::render_run_summary;
use crate::models::AggregatedSummary;

/// Write a text artifact, creating parent directories
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write file: {:?}", path))
}

/// Pretty-print a document and write it; returns the written text
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<String> {
    let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    write_text(path, &content)?;
    Ok(content)
}

/// Paths of the run-level outputs
#[derive(Debug, Clone)]
pub struct RunOutputs {
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}

/// Write `summary.json` and `summary.md` into `out_dir`
pub fn write_run_summary(out_dir: &Path, summary: &AggregatedSummary) -> Result<RunOutputs> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;

    let json_path = out_dir.join("summary.json");
    write_json(&json_path, summary)?;

    let markdown_path = out_dir.join("summary.md");
    write_text(&markdown_path, &render_run_summary(summary))?;

    Ok(RunOutputs {
        json_path,
        markdown_path,
    })
}
