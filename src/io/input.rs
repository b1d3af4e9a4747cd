use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::error::ReviewError;
use crate::models::SourceUnit;

/// Default discovery pattern, relative to the scan root
pub const DEFAULT_PATTERN: &str = "**/*.sql";

/// Find files under `root` matching a glob pattern, sorted by path
pub fn discover_files(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let root_str = root.to_string_lossy();
    let full_pattern = format!(
        "{}/{}",
        glob::Pattern::escape(root_str.trim_end_matches('/')),
        pattern.trim_start_matches('/')
    );

    let entries = glob::glob(&full_pattern)
        .with_context(|| format!("Invalid file pattern: {}", pattern))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable path {:?}: {}", e.path(), e.error());
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();

    files.sort();
    files.dedup();
    Ok(files)
}

/// Read a source file into a checksummed unit
pub fn read_source(path: &Path) -> Result<SourceUnit, ReviewError> {
    if !path.exists() {
        return Err(ReviewError::MissingInput(path.to_path_buf()));
    }

    let text = std::fs::read_to_string(path).map_err(|e| ReviewError::io(path, e))?;
    Ok(SourceUnit::new(path, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_sorted_and_recursive() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pkg/sub")).unwrap();
        fs::write(dir.path().join("z.sql"), "z").unwrap();
        fs::write(dir.path().join("a.sql"), "a").unwrap();
        fs::write(dir.path().join("pkg/sub/m.sql"), "m").unwrap();
        fs::write(dir.path().join("notes.txt"), "n").unwrap();
        fs::create_dir_all(dir.path().join("dir.sql")).unwrap();

        let files = discover_files(dir.path(), DEFAULT_PATTERN).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();

        assert_eq!(names, vec!["a.sql", "pkg/sub/m.sql", "z.sql"]);
    }

    #[test]
    fn test_discover_with_custom_pattern() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("body.pkb"), "b").unwrap();
        fs::write(dir.path().join("spec.pks"), "s").unwrap();

        let files = discover_files(dir.path(), "*.pk[bs]").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("body.pkb"));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(discover_files(dir.path(), "[").is_err());
    }

    #[test]
    fn test_read_source_missing_input() {
        let dir = TempDir::new().unwrap();
        let err = read_source(&dir.path().join("missing.sql")).unwrap_err();
        assert!(matches!(err, ReviewError::MissingInput(_)));
    }

    #[test]
    fn test_read_source_checksum() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.sql");
        fs::write(&path, "abc").unwrap();

        let unit = read_source(&path).unwrap();
        assert_eq!(unit.text, "abc");
        assert_eq!(
            unit.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
