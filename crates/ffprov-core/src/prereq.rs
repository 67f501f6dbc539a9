//! Accelerator prerequisite check.
//!
//! A missing device is fatal. An old driver is not: encoding may still work,
//! so it only produces a warning.

use crate::tools::{GpuInfo, GpuQuery, ToolError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrerequisiteResult {
    pub name: String,
    pub version: String,
    pub verdict: Verdict,
    /// Why the verdict is not `Pass`.
    pub detail: Option<String>,
}

#[derive(Debug, Error)]
pub enum PrereqError {
    #[error("no NVIDIA GPU detected: {0}")]
    NoAccelerator(String),
}

/// Leading integer component of a driver version (`572.16` -> 572).
pub fn driver_major(version: &str) -> Option<u32> {
    version.trim().split('.').next()?.trim().parse().ok()
}

/// Classify a query outcome against the minimum driver major version.
/// An unparseable version counts as below minimum.
pub fn assess(query: Result<GpuInfo, ToolError>, min_major: u32) -> PrerequisiteResult {
    let info = match query {
        Ok(info) => info,
        Err(e) => {
            return PrerequisiteResult {
                name: String::new(),
                version: String::new(),
                verdict: Verdict::Fail,
                detail: Some(e.to_string()),
            }
        }
    };
    let (verdict, detail) = match driver_major(&info.driver_version) {
        Some(major) if major >= min_major => (Verdict::Pass, None),
        Some(major) => (
            Verdict::Warn,
            Some(format!("driver {} is older than {}.x", major, min_major)),
        ),
        None => (
            Verdict::Warn,
            Some(format!("unrecognised driver version {:?}", info.driver_version)),
        ),
    };
    PrerequisiteResult {
        name: info.name,
        version: info.driver_version,
        verdict,
        detail,
    }
}

/// Query the accelerator and log the verdict. `Fail` becomes an error.
pub fn check_prerequisite(
    gpu: &dyn GpuQuery,
    min_major: u32,
) -> Result<PrerequisiteResult, PrereqError> {
    let result = assess(gpu.query(), min_major);
    match result.verdict {
        Verdict::Pass => {
            tracing::info!("GPU: {}  Driver: {}", result.name, result.version);
        }
        Verdict::Warn => {
            tracing::info!("GPU: {}  Driver: {}", result.name, result.version);
            tracing::warn!(
                "{}; {}.x or newer recommended for NVENC",
                result.detail.as_deref().unwrap_or("driver check inconclusive"),
                min_major
            );
        }
        Verdict::Fail => {
            let reason = result.detail.clone().unwrap_or_default();
            tracing::debug!("no NVIDIA GPU detected: {}", reason);
            return Err(PrereqError::NoAccelerator(reason));
        }
    }
    Ok(result)
}
