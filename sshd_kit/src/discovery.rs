//! Policy file discovery
//!
//! A policy bundle is addressed by a filesystem path: either a single `.esp`
//! file or a directory holding `.esp` files.

use std::path::{Path, PathBuf};

const POLICY_EXTENSION: &str = "esp";

/// Discover all policy files in a bundle path
///
/// If the path is a file, returns a vec containing just that file.
/// If the path is a directory, returns all .esp files in it (non-recursive),
/// sorted so evaluation order is stable.
pub fn discover_policy_files(bundle_path: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    if bundle_path.is_file() {
        Ok(vec![bundle_path.to_path_buf()])
    } else if bundle_path.is_dir() {
        discover_in_directory(bundle_path)
    } else {
        Err(DiscoveryError::InvalidPath(bundle_path.to_path_buf()))
    }
}

fn discover_in_directory(dir_path: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut policy_files = Vec::new();

    let entries = std::fs::read_dir(dir_path)
        .map_err(|e| DiscoveryError::ReadDir(dir_path.to_path_buf(), e))?;

    for entry in entries {
        let entry = entry.map_err(|e| DiscoveryError::ReadEntry(dir_path.to_path_buf(), e))?;
        let path = entry.path();

        if path.is_file() && path.extension().is_some_and(|ext| ext == POLICY_EXTENSION) {
            policy_files.push(path);
        }
    }

    policy_files.sort();
    Ok(policy_files)
}

/// Errors that can occur during policy discovery
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Invalid policy path: {}", .0.display())]
    InvalidPath(PathBuf),
    #[error("Failed to read directory {}: {}", .0.display(), .1)]
    ReadDir(PathBuf, #[source] std::io::Error),
    #[error("Failed to read entry in {}: {}", .0.display(), .1)]
    ReadEntry(PathBuf, #[source] std::io::Error),
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sshd_kit_discovery_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_discovers_sorted_esp_files_only() {
        let dir = scratch_dir("sorted");
        std::fs::write(dir.join("b_root_login.esp"), "").unwrap();
        std::fs::write(dir.join("a_password_auth.esp"), "").unwrap();
        std::fs::write(dir.join("README.md"), "").unwrap();
        std::fs::create_dir(dir.join("nested.esp")).unwrap();

        let files = discover_policy_files(&dir).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["a_password_auth.esp", "b_root_login.esp"]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_single_file_bundle() {
        let dir = scratch_dir("single");
        let file = dir.join("policy.esp");
        std::fs::write(&file, "").unwrap();

        assert_eq!(discover_policy_files(&file).unwrap(), vec![file.clone()]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_path_is_invalid() {
        let err = discover_policy_files(Path::new("/nonexistent/sshd/policies")).unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidPath(_)));
    }
}
