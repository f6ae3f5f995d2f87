//! Shared test utilities.
//!
//! Only compiled when running tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::Settings;
use crate::workspace::Workspace;

/// Creates a temporary workspace directory for testing.
///
/// Returns the `TempDir` handle (keep it alive for the test duration) and the
/// path of a non-hidden `scripts` subdirectory. Workspace construction skips
/// hidden directories, and temp directories are sometimes created under
/// paths like `/tmp/.tmpXXXXX`.
pub fn create_test_workspace_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let root = temp_dir.path().join("scripts");
    fs::create_dir(&root).expect("Failed to create scripts subdirectory");
    (temp_dir, root)
}

/// Writes `text` to `root/relative`, creating parent directories.
pub fn write_script(root: &Path, relative: &str, text: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create script directory");
    }
    fs::write(&path, text).expect("Failed to write script");
    path
}

/// Creates a workspace on disk from `(relative path, text)` pairs and
/// constructs it with default settings.
pub fn create_test_workspace(files: &[(&str, &str)]) -> (TempDir, PathBuf, Workspace) {
    let (temp_dir, root) = create_test_workspace_dir();
    for (relative, text) in files {
        write_script(&root, relative, text);
    }
    let workspace = Workspace::construct_workspace(&Settings::default(), &root)
        .expect("Failed to construct test workspace");
    (temp_dir, root, workspace)
}
