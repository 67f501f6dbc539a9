//! Persistent PATH registration for the staged toolchain.
//!
//! Failures here never abort provisioning: the encoder still works through
//! absolute paths, so every problem is downgraded to a warning.

use crate::host::{HostEnvironment, PATH_LIST_SEPARATOR};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRegistration {
    AlreadyPresent,
    Added,
    Failed,
}

/// Append `dir` to the machine PATH unless an equivalent entry is already there.
pub fn register_bin_dir(host: &dyn HostEnvironment, dir: &Path) -> PathRegistration {
    let current = match host.system_path() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("could not read the system PATH: {:#}", e);
            return PathRegistration::Failed;
        }
    };

    let wanted = dir.to_string_lossy();
    if current
        .split(PATH_LIST_SEPARATOR)
        .any(|entry| same_entry(entry, &wanted))
    {
        tracing::info!("{} already on the system PATH", wanted);
        return PathRegistration::AlreadyPresent;
    }

    let trimmed = current.trim_end_matches(PATH_LIST_SEPARATOR);
    let updated = if trimmed.is_empty() {
        wanted.to_string()
    } else {
        format!("{}{}{}", trimmed, PATH_LIST_SEPARATOR, wanted)
    };
    if let Err(e) = host.set_system_path(&updated) {
        tracing::warn!("could not add {} to the system PATH: {:#}", wanted, e);
        return PathRegistration::Failed;
    }
    tracing::info!("added {} to the system PATH", wanted);

    if let Err(e) = host.broadcast_environment_change() {
        tracing::warn!("failed to broadcast environment change: {:#}", e);
    }
    PathRegistration::Added
}

/// PATH entries compare without trailing separators, case-insensitively on Windows.
fn same_entry(entry: &str, wanted: &str) -> bool {
    let strip = |s: &str| s.trim().trim_end_matches(['/', '\\']).to_string();
    let (a, b) = (strip(entry), strip(wanted));
    if a.is_empty() {
        return false;
    }
    if cfg!(windows) {
        a.eq_ignore_ascii_case(&b)
    } else {
        a == b
    }
}
