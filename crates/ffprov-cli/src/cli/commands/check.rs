//! `ffprov check` – accelerator prerequisite only.

use anyhow::Result;
use ffprov_core::config::ProvisionConfig;
use ffprov_core::host::{HostEnvironment, SystemHost};
use ffprov_core::prereq::{self, Verdict};
use ffprov_core::tools::NvidiaSmi;
use ffprov_core::ProvisionError;

pub fn run_check(cfg: &ProvisionConfig) -> Result<()> {
    let result = prereq::check_prerequisite(&NvidiaSmi::new(), cfg.gpu.min_driver_major)
        .map_err(ProvisionError::from)?;

    let verdict = match result.verdict {
        Verdict::Pass => "ok",
        Verdict::Warn => "warning",
        Verdict::Fail => "failed",
    };
    println!("GPU:      {}", result.name);
    println!("Driver:   {} ({})", result.version, verdict);
    if let Some(detail) = &result.detail {
        println!("          {}", detail);
    }

    let host = SystemHost::new(cfg.path.profile_script.clone());
    println!(
        "Elevated: {}",
        if host.is_elevated() { "yes" } else { "no (install will be refused)" }
    );
    Ok(())
}
