//! Hardware-encode smoke test against the installed toolchain.

use crate::config::SmokeConfig;
use crate::layout;
use crate::tools::{os_args, ProcessRunner, ToolError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmokeOutcome {
    Passed,
    /// No sample clip available; the test did not run.
    Skipped { sample: Option<PathBuf> },
}

#[derive(Debug, Error)]
pub enum SmokeError {
    #[error("smoke test could not run {}: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: ToolError,
    },

    #[error("smoke test failed ({status}, {marker} {}): {detail}", if *marker_seen { "reported" } else { "not reported" })]
    Failed {
        status: String,
        marker: String,
        marker_seen: bool,
        detail: String,
    },
}

/// Arguments for decoding `sample` with the hardware decoder and encoding it to a null sink.
pub fn encode_args(sample: &Path, settings: &SmokeConfig) -> Vec<OsString> {
    let mut args = os_args(["-hide_banner", "-y", "-hwaccel", settings.hwaccel.as_str(), "-i"]);
    args.push(sample.as_os_str().to_os_string());
    args.extend(os_args(["-c:v", settings.encoder.as_str(), "-f", "null", "-"]));
    args
}

/// Encode the sample clip with `<install_root>/bin/ffmpeg`. Passing needs exit
/// status 0 and the configured marker somewhere on stderr.
pub fn smoke_test(
    runner: &dyn ProcessRunner,
    install_root: &Path,
    settings: &SmokeConfig,
) -> Result<SmokeOutcome, SmokeError> {
    let sample = settings.resolved_sample();
    let sample_path = match &sample {
        Some(p) if p.is_file() => p.clone(),
        _ => {
            tracing::warn!(
                "sample clip {} not found; skipping smoke test",
                sample.as_deref().map(|p| p.display().to_string()).unwrap_or_default()
            );
            return Ok(SmokeOutcome::Skipped { sample });
        }
    };

    let ffmpeg = layout::executable_path(install_root, "ffmpeg");
    tracing::info!("smoke test: {} {} via {}", ffmpeg.display(), settings.encoder, sample_path.display());
    let output = runner
        .run(ffmpeg.as_os_str(), &encode_args(&sample_path, settings))
        .map_err(|source| SmokeError::Launch { program: ffmpeg.clone(), source })?;

    let marker_seen = output.stderr.contains(&settings.marker);
    if output.success() && marker_seen {
        tracing::info!("smoke test passed");
        return Ok(SmokeOutcome::Passed);
    }

    let detail = output
        .stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default()
        .trim()
        .to_string();
    tracing::debug!("smoke test failed: {} ({})", output.status_text(), detail);
    Err(SmokeError::Failed {
        status: output.status_text(),
        marker: settings.marker.clone(),
        marker_seen,
        detail,
    })
}
