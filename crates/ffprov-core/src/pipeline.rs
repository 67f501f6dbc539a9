//! End-to-end provisioning: prerequisite, fetch, stage, PATH, service, smoke test.
//!
//! Every collaborator that touches the host comes in through [`Toolbox`], so
//! the whole sequence runs against fakes in tests.

use crate::config::{ProvisionConfig, ToolchainSource};
use crate::error::ProvisionError;
use crate::fetch::{self, ArtifactSource, FetchedArtifact};
use crate::host::HostEnvironment;
use crate::layout;
use crate::path_env::{self, PathRegistration};
use crate::prereq::{self, PrerequisiteResult};
use crate::service::{IntegrationOutcome, Integrator};
use crate::smoke::{self, SmokeOutcome};
use crate::stage::{self, StagedInstall};
use crate::toolchain::{self, InstalledToolchain};
use crate::tools::{GpuQuery, PackageManager, ProcessRunner, ServiceControl};
use std::path::Path;

/// Host-facing collaborators.
#[derive(Clone, Copy)]
pub struct Toolbox<'a> {
    pub host: &'a dyn HostEnvironment,
    pub gpu: &'a dyn GpuQuery,
    pub service: &'a dyn ServiceControl,
    pub packages: &'a dyn PackageManager,
    pub runner: &'a dyn ProcessRunner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainLocation {
    Staged {
        artifact: FetchedArtifact,
        install: StagedInstall,
    },
    Package(InstalledToolchain),
}

impl ToolchainLocation {
    pub fn root(&self) -> &Path {
        match self {
            ToolchainLocation::Staged { install, .. } => &install.dir,
            ToolchainLocation::Package(installed) => &installed.root,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub prerequisite: PrerequisiteResult,
    pub toolchain: ToolchainLocation,
    /// `None` when registration is disabled or the package manager owns PATH.
    pub path: Option<PathRegistration>,
    pub integration: IntegrationOutcome,
    pub smoke: SmokeOutcome,
}

pub struct Pipeline<'a> {
    cfg: &'a ProvisionConfig,
    tools: Toolbox<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(cfg: &'a ProvisionConfig, tools: Toolbox<'a>) -> Self {
        Self { cfg, tools }
    }

    /// Run every stage in order, stopping at the first fatal error.
    pub fn run(&self) -> Result<PipelineReport, ProvisionError> {
        ensure_elevated(self.cfg, self.tools.host)?;
        let prerequisite = prereq::check_prerequisite(self.tools.gpu, self.cfg.gpu.min_driver_major)?;

        let (toolchain, path) = match self.cfg.toolchain.source {
            ToolchainSource::Archive => {
                let artifact = fetch_verified(self.cfg)?;
                let install = stage::stage(
                    &artifact.path,
                    &self.cfg.artifact.install_dir,
                    self.cfg.artifact.force,
                )?;
                let path = self.cfg.path.register.then(|| {
                    path_env::register_bin_dir(self.tools.host, &layout::bin_dir(&install.dir))
                });
                (ToolchainLocation::Staged { artifact, install }, path)
            }
            ToolchainSource::PackageManager => {
                let installed = toolchain::install_with_package_manager(
                    self.tools.packages,
                    self.tools.host,
                    &self.cfg.toolchain.package,
                    "ffmpeg",
                )?;
                (ToolchainLocation::Package(installed), None)
            }
        };

        let integration = Integrator::new(&self.cfg.service, self.tools.service, self.tools.host)
            .integrate(toolchain.root())?;
        let smoke = smoke::smoke_test(self.tools.runner, toolchain.root(), &self.cfg.smoke)?;

        tracing::info!("provisioning complete: {}", toolchain.root().display());
        Ok(PipelineReport {
            prerequisite,
            toolchain,
            path,
            integration,
            smoke,
        })
    }
}

/// Refuse to continue without administrative rights when the config requires them.
pub fn ensure_elevated(
    cfg: &ProvisionConfig,
    host: &dyn HostEnvironment,
) -> Result<(), ProvisionError> {
    if cfg.require_elevation && !host.is_elevated() {
        tracing::debug!("administrative privileges are required");
        return Err(ProvisionError::NotElevated);
    }
    Ok(())
}

/// Acquire and verify the archive only (cache or network, per config).
pub fn fetch_verified(cfg: &ProvisionConfig) -> Result<FetchedArtifact, ProvisionError> {
    let source = ArtifactSource {
        url: cfg.artifact.url.clone(),
        cache_dir: cfg.artifact.cache_dir.clone(),
    };
    Ok(fetch::fetch_artifact(&source, &cfg.artifact.resolved_work_dir())?)
}
