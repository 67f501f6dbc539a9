//! Install tree conventions shared by staging, deployment and the smoke test.

use std::path::{Path, PathBuf};

/// `<root>/bin`, where the release archives keep their executables.
pub fn bin_dir(root: &Path) -> PathBuf {
    root.join("bin")
}

/// `name` with the platform executable suffix (`.exe` on Windows).
pub fn executable_name(name: &str) -> String {
    format!("{}{}", name, std::env::consts::EXE_SUFFIX)
}

pub fn executable_path(root: &Path, name: &str) -> PathBuf {
    bin_dir(root).join(executable_name(name))
}
