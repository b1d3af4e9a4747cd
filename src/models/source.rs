use std::path::PathBuf;

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a byte slice
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// A reviewed file. Identity is the content checksum.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub text: String,
    pub sha256: String,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, text: String) -> Self {
        let sha256 = sha256_hex(text.as_bytes());
        Self {
            path: path.into(),
            text,
            sha256,
        }
    }

    /// File name used in report headings
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// File stem used to name per-file artifacts
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source".to_string())
    }

    /// Extension of the source, reused for the refactored copy
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_content_identity() {
        let a = SourceUnit::new("a/pkg.sql", "select 1 from dual;".to_string());
        let b = SourceUnit::new("b/other.sql", "select 1 from dual;".to_string());
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(a.sha256.len(), 64);
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_names() {
        let unit = SourceUnit::new("sql/billing/pkg_invoice.pkb", String::new());
        assert_eq!(unit.file_name(), "pkg_invoice.pkb");
        assert_eq!(unit.base_name(), "pkg_invoice");
        assert_eq!(unit.extension(), Some("pkb"));
    }
}
