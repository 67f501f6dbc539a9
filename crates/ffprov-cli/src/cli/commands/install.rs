//! `ffprov install` – run the whole provisioning pipeline against the real host.

use anyhow::Result;
use ffprov_core::config::ProvisionConfig;
use ffprov_core::host::SystemHost;
use ffprov_core::path_env::PathRegistration;
use ffprov_core::pipeline::{PipelineReport, ToolchainLocation};
use ffprov_core::service::{IntegrationOutcome, StopOutcome};
use ffprov_core::smoke::SmokeOutcome;
use ffprov_core::tools::{default_package_manager, default_service_control, NvidiaSmi, SystemRunner};
use ffprov_core::{Pipeline, Toolbox};

pub fn run_install(cfg: &ProvisionConfig) -> Result<()> {
    let host = SystemHost::new(cfg.path.profile_script.clone());
    let gpu = NvidiaSmi::new();
    let service = default_service_control();
    let packages = default_package_manager();
    let runner = SystemRunner;

    let tools = Toolbox {
        host: &host,
        gpu: &gpu,
        service: service.as_ref(),
        packages: packages.as_ref(),
        runner: &runner,
    };
    let report = Pipeline::new(cfg, tools).run()?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &PipelineReport) {
    let pre = &report.prerequisite;
    println!("GPU:        {} (driver {})", pre.name, pre.version);

    match &report.toolchain {
        ToolchainLocation::Staged { artifact, install } => {
            println!(
                "FFmpeg:     {} ({:?}, archive {})",
                install.dir.display(),
                install.outcome,
                if artifact.from_cache { "from cache" } else { "downloaded" }
            );
        }
        ToolchainLocation::Package(installed) => {
            println!("FFmpeg:     {} (package manager)", installed.root.display());
        }
    }

    let path = match report.path {
        Some(PathRegistration::Added) => "bin directory added",
        Some(PathRegistration::AlreadyPresent) => "already present",
        Some(PathRegistration::Failed) => "update failed, see log",
        None => "unchanged",
    };
    println!("PATH:       {}", path);

    match &report.integration {
        IntegrationOutcome::Skipped => println!("Service:    skipped"),
        IntegrationOutcome::Completed(summary) => {
            println!(
                "Service:    {} ({} binaries deployed{}{})",
                summary.endpoint.install_dir.display(),
                summary.deployed.len(),
                if summary.config_patched { ", config patched" } else { "" },
                if summary.stop == StopOutcome::TimedOut { ", stop timed out" } else { "" },
            );
        }
    }

    match &report.smoke {
        SmokeOutcome::Passed => println!("Smoke test: passed"),
        SmokeOutcome::Skipped { .. } => println!("Smoke test: skipped (no sample clip)"),
    }
}
