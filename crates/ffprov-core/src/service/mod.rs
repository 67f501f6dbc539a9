//! Service integration: locate the dependent service, stop it, deploy the new
//! binaries into it, patch its encoder settings and start it again.
//!
//! The steps run strictly in order. Stopping is best effort (the service may
//! already be down or slow to stop); deploying, patching and starting are not.

mod ini;
mod locate;

pub use ini::{patch_ini, patch_ini_file};
pub use locate::{locate_install_dir, LocateSource};

use crate::config::ServiceConfig;
use crate::host::HostEnvironment;
use crate::layout;
use crate::tools::{ServiceControl, ServiceStatus, ToolError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Integration steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationStep {
    Locate,
    Stop,
    Deploy,
    PatchConfig,
    Start,
}

/// The service as resolved for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub install_dir: PathBuf,
    /// Executable file names (platform suffix included) copied into `<install_dir>/bin`.
    pub binaries: Vec<String>,
    pub overrides: Vec<(String, String)>,
}

impl ServiceEndpoint {
    pub fn from_settings(install_dir: PathBuf, settings: &ServiceConfig) -> Self {
        Self {
            install_dir,
            binaries: settings.binaries.iter().map(|b| layout::executable_name(b)).collect(),
            overrides: vec![
                (settings.codec_key.clone(), settings.codec.clone()),
                (settings.bitrate_key.clone(), settings.bitrate.clone()),
            ],
        }
    }

    pub fn bin_dir(&self) -> PathBuf {
        layout::bin_dir(&self.install_dir)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// Not confirmed stopped before the timeout; deployment went ahead anyway.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationSummary {
    pub endpoint: ServiceEndpoint,
    pub located_from: LocateSource,
    pub stop: StopOutcome,
    pub deployed: Vec<PathBuf>,
    /// `false` when the service has no config file to patch.
    pub config_patched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationOutcome {
    Skipped,
    Completed(IntegrationSummary),
}

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("deploy {} to {}: {source}", from.display(), to.display())]
    Deploy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("patch {}: {source}", path.display())]
    PatchConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("start service {name}: {source}")]
    Start {
        name: String,
        #[source]
        source: ToolError,
    },
}

impl IntegrationError {
    pub fn step(&self) -> IntegrationStep {
        match self {
            IntegrationError::Deploy { .. } => IntegrationStep::Deploy,
            IntegrationError::PatchConfig { .. } => IntegrationStep::PatchConfig,
            IntegrationError::Start { .. } => IntegrationStep::Start,
        }
    }
}

pub struct Integrator<'a> {
    settings: &'a ServiceConfig,
    control: &'a dyn ServiceControl,
    host: &'a dyn HostEnvironment,
}

impl<'a> Integrator<'a> {
    pub fn new(
        settings: &'a ServiceConfig,
        control: &'a dyn ServiceControl,
        host: &'a dyn HostEnvironment,
    ) -> Self {
        Self { settings, control, host }
    }

    /// Run every step against the toolchain installed at `toolchain_root`.
    /// With integration disabled nothing is looked up and no service command runs.
    pub fn integrate(&self, toolchain_root: &Path) -> Result<IntegrationOutcome, IntegrationError> {
        if !self.settings.enabled {
            tracing::info!("service integration disabled; skipping");
            return Ok(IntegrationOutcome::Skipped);
        }

        let (install_dir, located_from) = locate_install_dir(self.settings, self.host);
        tracing::info!("{} at {} ({:?})", self.settings.name, install_dir.display(), located_from);
        let endpoint = ServiceEndpoint::from_settings(install_dir, self.settings);

        let stop = self.stop();
        let deployed = deploy_binaries(toolchain_root, &endpoint)?;
        let config_patched = self.patch_config(&endpoint)?;
        self.start()?;

        Ok(IntegrationOutcome::Completed(IntegrationSummary {
            endpoint,
            located_from,
            stop,
            deployed,
            config_patched,
        }))
    }

    fn stop(&self) -> StopOutcome {
        let name = &self.settings.name;
        tracing::info!("stopping {}", name);
        if let Err(e) = self.control.stop(name) {
            tracing::debug!("stop request for {} failed: {}", name, e);
        }
        wait_for_stop(
            self.control,
            name,
            self.settings.stop_timeout(),
            self.settings.poll_interval(),
        )
    }

    fn patch_config(&self, endpoint: &ServiceEndpoint) -> Result<bool, IntegrationError> {
        let path = endpoint.install_dir.join(&self.settings.config_file);
        let entries: Vec<(&str, &str)> = endpoint
            .overrides
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let patched = patch_ini_file(&path, &self.settings.config_section, &entries)
            .map_err(|source| IntegrationError::PatchConfig { path: path.clone(), source })?;
        if patched {
            tracing::info!("patched [{}] in {}", self.settings.config_section, path.display());
        } else {
            tracing::warn!("{} not found; encoder settings left unchanged", path.display());
        }
        Ok(patched)
    }

    fn start(&self) -> Result<(), IntegrationError> {
        let name = &self.settings.name;
        tracing::info!("starting {}", name);
        self.control.start(name).map_err(|source| {
            tracing::debug!("failed to start {}: {}", name, source);
            IntegrationError::Start { name: name.clone(), source }
        })
    }
}

/// Poll until `name` reports stopped or `timeout` elapses. Query failures count as "not stopped".
pub fn wait_for_stop(
    control: &dyn ServiceControl,
    name: &str,
    timeout: Duration,
    interval: Duration,
) -> StopOutcome {
    let started = Instant::now();
    while started.elapsed() < timeout {
        match control.query(name) {
            Ok(ServiceStatus::Stopped) => {
                tracing::info!("{} stopped", name);
                return StopOutcome::Stopped;
            }
            Ok(ServiceStatus::NotStopped) => {}
            Err(e) => tracing::debug!("query {} failed: {}", name, e),
        }
        thread::sleep(interval);
    }
    tracing::warn!(
        "{} did not report stopped within {:?}; deploying anyway",
        name,
        timeout
    );
    StopOutcome::TimedOut
}

/// Copy each binary from `<toolchain_root>/bin` into the service's `bin`, overwriting.
/// A missing source binary is fatal.
pub fn deploy_binaries(
    toolchain_root: &Path,
    endpoint: &ServiceEndpoint,
) -> Result<Vec<PathBuf>, IntegrationError> {
    let source_dir = layout::bin_dir(toolchain_root);
    let dest_dir = endpoint.bin_dir();
    fs::create_dir_all(&dest_dir).map_err(|source| IntegrationError::Deploy {
        from: source_dir.clone(),
        to: dest_dir.clone(),
        source,
    })?;

    let mut deployed = Vec::with_capacity(endpoint.binaries.len());
    for file in &endpoint.binaries {
        let from = source_dir.join(file);
        let to = dest_dir.join(file);
        fs::copy(&from, &to).map_err(|source| {
            tracing::debug!("failed to deploy {}: {}", from.display(), source);
            IntegrationError::Deploy { from: from.clone(), to: to.clone(), source }
        })?;
        tracing::info!("deployed {}", to.display());
        deployed.push(to);
    }
    Ok(deployed)
}
