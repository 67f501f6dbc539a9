//! Accelerator discovery through `nvidia-smi`.

use super::process::{os_args, ProcessRunner, SystemRunner, ToolError};
use std::ffi::OsStr;

const NVIDIA_SMI: &str = "nvidia-smi";

/// First accelerator reported by the driver tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuInfo {
    pub name: String,
    pub driver_version: String,
}

pub trait GpuQuery {
    /// Name and driver version of the first device. Any error means no usable device.
    fn query(&self) -> Result<GpuInfo, ToolError>;
}

#[derive(Debug, Clone, Default)]
pub struct NvidiaSmi<R = SystemRunner> {
    runner: R,
}

impl NvidiaSmi<SystemRunner> {
    pub fn new() -> Self {
        Self { runner: SystemRunner }
    }
}

impl<R: ProcessRunner> NvidiaSmi<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: ProcessRunner> GpuQuery for NvidiaSmi<R> {
    fn query(&self) -> Result<GpuInfo, ToolError> {
        let args = os_args(["--query-gpu=name,driver_version", "--format=csv,noheader"]);
        let output = self
            .runner
            .run(OsStr::new(NVIDIA_SMI), &args)?
            .into_result(NVIDIA_SMI)?;
        parse_gpu_csv(&output.stdout).ok_or_else(|| ToolError::Parse {
            program: NVIDIA_SMI.to_string(),
            detail: format!("expected `name, driver_version`, got {:?}", output.stdout.trim()),
        })
    }
}

/// Parses the first `name, driver_version` line of `--format=csv,noheader` output.
/// The name may not contain a comma; the driver version is everything after the first one.
pub fn parse_gpu_csv(stdout: &str) -> Option<GpuInfo> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (name, driver) = line.split_once(',')?;
    let (name, driver) = (name.trim(), driver.trim());
    if name.is_empty() || driver.is_empty() {
        return None;
    }
    Some(GpuInfo {
        name: name.to_string(),
        driver_version: driver.to_string(),
    })
}
