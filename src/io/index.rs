//! Cross-run index of run records.
//!
//! `index.json` is a JSON array rewritten in full on every update. Existing
//! entries are kept verbatim (including shapes this version does not know);
//! only corrupt or non-array content resets the index. There is no locking,
//! so two runs sharing a log directory can still drop each other's entries.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::RunRecord;

pub const INDEX_FILE_NAME: &str = "index.json";

/// A run record plus the location of its standalone run log
#[derive(Debug, Clone, Serialize)]
pub struct IndexEntry<'a> {
    #[serde(flatten)]
    pub record: &'a RunRecord,
    pub runlog_path: String,
}

#[derive(Debug)]
pub struct GlobalIndex {
    path: PathBuf,
    entries: Vec<Value>,
}

impl GlobalIndex {
    /// Load the index in `log_dir`, starting empty when absent or unreadable
    pub fn load(log_dir: &Path) -> Self {
        let path = log_dir.join(INDEX_FILE_NAME);

        let entries = if path.is_file() {
            match std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|text| Ok(serde_json::from_str::<Value>(&text)?))
            {
                Ok(Value::Array(entries)) => entries,
                Ok(_) => {
                    warn!("Index {:?} is not a list; starting a new one", path);
                    Vec::new()
                }
                Err(e) => {
                    warn!("Index {:?} is unreadable ({}); starting a new one", path, e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Self { path, entries }
    }

    pub fn append(&mut self, record: &RunRecord, runlog_path: &Path) -> Result<()> {
        let entry = IndexEntry {
            record,
            runlog_path: runlog_path.display().to_string(),
        };
        self.entries
            .push(serde_json::to_value(entry).context("Failed to serialize index entry")?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Value] {
        &self.entries
    }

    /// Rewrite the index through a sibling temp file and a rename
    pub fn save(&self) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(&self.entries).context("Failed to serialize index")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("Failed to write index: {:?}", tmp))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace index: {:?}", self.path))?;

        Ok(self.path.clone())
    }
}

/// Append records to the index in `log_dir` and save it
pub fn update_global_index(log_dir: &Path, runs: &[(RunRecord, PathBuf)]) -> Result<PathBuf> {
    let mut index = GlobalIndex::load(log_dir);
    for (record, runlog_path) in runs {
        index.append(record, runlog_path)?;
    }
    index.save()
}
