//! Fatal pipeline errors and their process exit codes.

use crate::fetch::FetchError;
use crate::prereq::PrereqError;
use crate::service::IntegrationError;
use crate::smoke::SmokeError;
use crate::stage::StageError;
use crate::toolchain::ToolchainError;
use thiserror::Error;

/// Process exit codes, one per fatal condition.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    /// Anything not covered below (config, logging, unexpected I/O).
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_ELEVATED: i32 = 10;
    pub const NO_ACCELERATOR: i32 = 20;
    pub const TRANSFER: i32 = 30;
    pub const CHECKSUM: i32 = 31;
    pub const CACHE_MISSING: i32 = 32;
    pub const ARCHIVE: i32 = 40;
    pub const STAGING: i32 = 41;
    pub const DEPLOY: i32 = 50;
    pub const SERVICE_START: i32 = 51;
    pub const CONFIG_PATCH: i32 = 52;
    pub const SMOKE: i32 = 60;
    pub const PACKAGE_MANAGER: i32 = 70;
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("administrative privileges are required; re-run from an elevated shell")]
    NotElevated,

    #[error(transparent)]
    Prerequisite(#[from] PrereqError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error(transparent)]
    Smoke(#[from] SmokeError),
}

impl ProvisionError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ProvisionError::NotElevated => exit::NOT_ELEVATED,
            ProvisionError::Prerequisite(_) => exit::NO_ACCELERATOR,
            ProvisionError::Fetch(e) => match e {
                FetchError::Transfer(_) => exit::TRANSFER,
                FetchError::ChecksumMismatch { .. } | FetchError::MalformedSidecar { .. } => {
                    exit::CHECKSUM
                }
                FetchError::CacheMissing { .. } => exit::CACHE_MISSING,
                FetchError::Io { .. } => exit::GENERAL,
            },
            ProvisionError::Stage(e) if e.is_archive_error() => exit::ARCHIVE,
            ProvisionError::Stage(_) => exit::STAGING,
            ProvisionError::Toolchain(_) => exit::PACKAGE_MANAGER,
            ProvisionError::Integration(e) => match e {
                IntegrationError::Deploy { .. } => exit::DEPLOY,
                IntegrationError::PatchConfig { .. } => exit::CONFIG_PATCH,
                IntegrationError::Start { .. } => exit::SERVICE_START,
            },
            ProvisionError::Smoke(_) => exit::SMOKE,
        }
    }
}
