//! Path utilities for test data and snapshot directories.
//!
//! Sample RISE snapshots live under `services/rise-edr/testdata/`. Tests that
//! need a custom layout write one into a temporary directory instead.

use serde_json::Value;
use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// This is determined by walking up from the current crate's manifest directory
/// until we find the workspace Cargo.toml.
pub fn workspace_root() -> PathBuf {
    // Start from the test-utils crate manifest dir
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Returns `services/{service_name}/testdata/`.
pub fn service_testdata_dir(service_name: &str) -> PathBuf {
    workspace_root()
        .join("services")
        .join(service_name)
        .join("testdata")
}

/// Searches for a test file in multiple locations.
///
/// This function checks the following locations in order:
/// 1. Environment variable `TEST_DATA_DIR` (if set)
/// 2. `services/rise-edr/testdata/`
/// 3. `testdata/` at the workspace root
///
/// # Returns
///
/// `Some(PathBuf)` if the file is found, `None` otherwise.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(test_data_dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(test_data_dir).join(name));
    }

    let root = workspace_root();
    candidates.extend([
        service_testdata_dir("rise-edr").join(name),
        root.join("testdata").join(name),
    ]);

    candidates.into_iter().find(|path| path.exists())
}

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Writes `value` as pretty JSON to `dir/relative`, creating parent directories.
pub fn write_json(dir: &Path, relative: &str, value: &Value) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create snapshot directory");
    }
    let body = serde_json::to_string_pretty(value).expect("Failed to serialize fixture");
    std::fs::write(&path, body).expect("Failed to write fixture");
    path
}

/// Lays out a snapshot directory the way the file-backed source reads it:
/// `location/pages/page-N.json`, `location/{id}.json` per location, and
/// `parameters.json`.
pub fn write_snapshot(dir: &Path, pages: &[(String, Value)], parameters: &Value) {
    for (i, (_, body)) in pages.iter().enumerate() {
        write_json(dir, &format!("location/pages/page-{}.json", i + 1), body);

        if let Some(records) = body["data"].as_array() {
            for record in records {
                if let Some(id) = record["attributes"]["_id"].as_i64() {
                    let single = serde_json::json!({ "data": record });
                    write_json(dir, &format!("location/{}.json", id), &single);
                }
            }
        }
    }
    write_json(dir, "parameters.json", parameters);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_is_valid() {
        let root = workspace_root();
        // Should contain Cargo.toml at workspace level
        assert!(
            root.join("Cargo.toml").exists(),
            "Workspace root should contain Cargo.toml: {:?}",
            root
        );
    }

    #[test]
    fn test_service_testdata_dir() {
        let dir = service_testdata_dir("rise-edr");
        assert!(dir.to_string_lossy().contains("rise-edr"));
        assert!(dir.to_string_lossy().ends_with("testdata"));
    }

    #[test]
    fn test_write_snapshot_layout() {
        let dir = temp_test_dir();
        let pages = crate::generate_pages(3, 2);
        write_snapshot(dir.path(), &pages, &serde_json::json!({}));

        assert!(dir.path().join("location/pages/page-1.json").exists());
        assert!(dir.path().join("location/pages/page-2.json").exists());
        assert!(dir.path().join("location/3.json").exists());
        assert!(dir.path().join("parameters.json").exists());
    }
}
