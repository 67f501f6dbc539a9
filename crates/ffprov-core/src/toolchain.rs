//! Toolchain provisioning through the host package manager.

use crate::host::HostEnvironment;
use crate::tools::{PackageManager, ToolError};
use std::path::PathBuf;
use thiserror::Error;

/// A toolchain found on PATH after a package install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledToolchain {
    /// Directory whose `bin` holds the executables.
    pub root: PathBuf,
    pub binary: PathBuf,
}

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("{manager} is unusable: {source}")]
    Unavailable {
        manager: String,
        #[source]
        source: ToolError,
    },

    #[error("{manager} is not installed and could not be bootstrapped: {source}")]
    Bootstrap {
        manager: String,
        #[source]
        source: ToolError,
    },

    #[error("{manager} failed to install {package}: {source}")]
    Install {
        manager: String,
        package: String,
        #[source]
        source: ToolError,
    },

    #[error("{program} not found on PATH after installing {package}")]
    NotOnPath { program: String, package: String },
}

/// Ensure the package manager exists, install `package`, then find `program` on PATH.
/// The toolchain root is the grandparent of the binary (`<root>/bin/<program>`).
pub fn install_with_package_manager(
    manager: &dyn PackageManager,
    host: &dyn HostEnvironment,
    package: &str,
    program: &str,
) -> Result<InstalledToolchain, ToolchainError> {
    let name = manager.name().to_string();
    match manager.version() {
        Ok(Some(version)) => tracing::info!("{} {} detected", name, version),
        Ok(None) => {
            tracing::info!("{} not found; installing it", name);
            manager.bootstrap().map_err(|source| ToolchainError::Bootstrap {
                manager: name.clone(),
                source,
            })?;
        }
        Err(source) => return Err(ToolchainError::Unavailable { manager: name, source }),
    }

    tracing::info!("installing {} with {}", package, name);
    manager.install(package).map_err(|source| ToolchainError::Install {
        manager: name.clone(),
        package: package.to_string(),
        source,
    })?;

    let not_found = || ToolchainError::NotOnPath {
        program: program.to_string(),
        package: package.to_string(),
    };
    let binary = host.find_on_path(program).ok_or_else(not_found)?;
    let root = binary
        .parent()
        .and_then(|bin| bin.parent())
        .map(PathBuf::from)
        .ok_or_else(not_found)?;
    tracing::info!("{} installed at {}", program, root.display());
    Ok(InstalledToolchain { root, binary })
}
