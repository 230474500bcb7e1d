//! Shared persistence utilities: atomic file writes, YAML load/save.
//!
//! Every artifact the pipeline produces goes through [`atomic_write`], so a
//! crashed run never leaves a half-written report or dataset behind.

use std::io;
use std::path::Path;

/// Atomically write YAML data to a file.
///
/// Serializes `data` with `serde_yaml`, writes to a `.tmp` sibling file,
/// then renames to the target path. Creates parent directories if needed.
pub fn atomic_write_yaml<T: serde::Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let yaml = serde_yaml::to_string(data).map_err(io::Error::other)?;
    atomic_write(path, yaml.as_bytes())
}

/// Atomically write raw bytes to a file.
///
/// Writes to a `.tmp` sibling file, then renames to the target path.
/// Creating the parent directory is idempotent, so repeated runs are safe.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "Wrote file");
    Ok(())
}

/// Load and deserialize YAML from a file.
///
/// Returns `Ok(None)` if the file doesn't exist.
/// Returns `Err` on I/O errors or deserialization failures.
pub fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let value =
        serde_yaml::from_str(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        p_value: f64,
        drift_status: bool,
    }

    #[test]
    fn test_atomic_write_yaml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.yaml");

        let data = Entry {
            p_value: 0.42,
            drift_status: false,
        };

        atomic_write_yaml(&path, &data).unwrap();
        let loaded: Option<Entry> = load_yaml(&path).unwrap();
        assert_eq!(loaded, Some(data));
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("dir").join("train.csv");

        atomic_write(&path, b"a,b\n1,2\n").unwrap();
        assert!(path.exists());

        // Second write into the same directory must not fail.
        atomic_write(&path, b"a,b\n3,4\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n3,4\n");
    }

    #[test]
    fn test_load_yaml_nonexistent() {
        let result: io::Result<Option<Entry>> = load_yaml(Path::new("/nonexistent/file.yaml"));
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_load_yaml_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "p_value: [unterminated").unwrap();
        let result: io::Result<Option<Entry>> = load_yaml(&path);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_atomic_write_no_tmp_leftover() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clean.yaml");

        atomic_write_yaml(&path, &"test").unwrap();

        let tmp = path.with_extension("tmp");
        assert!(!tmp.exists());
    }
}
