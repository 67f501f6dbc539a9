//! Resolve the dependent service's install directory.

use crate::config::ServiceConfig;
use crate::host::HostEnvironment;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateSource {
    Override,
    Registry,
    Default,
}

/// Explicit override, then the registry value, then the configured default.
/// The directory is not required to exist.
pub fn locate_install_dir(
    settings: &ServiceConfig,
    host: &dyn HostEnvironment,
) -> (PathBuf, LocateSource) {
    if let Some(dir) = &settings.install_dir {
        return (dir.clone(), LocateSource::Override);
    }
    match host.registry_value(&settings.registry_key, &settings.registry_value) {
        Some(found) if !found.trim().is_empty() => {
            (PathBuf::from(found.trim()), LocateSource::Registry)
        }
        _ => {
            tracing::info!(
                "{} not found in {}; using default {}",
                settings.registry_value,
                settings.registry_key,
                settings.default_dir.display()
            );
            (settings.default_dir.clone(), LocateSource::Default)
        }
    }
}
