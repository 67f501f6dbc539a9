//! CLI for the ffprov provisioning pipeline.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use ffprov_core::config::{self, ProvisionConfig, ToolchainSource};
use std::path::{Path, PathBuf};

use commands::{run_check, run_checksum, run_completions, run_fetch, run_install, run_man};

const EXIT_CODES: &str = "\
Exit status:
   0  success (skipped service integration or smoke test included)
   1  unexpected failure (config unreadable, I/O outside a stage)
   2  command-line usage error
  10  administrative privileges required
  20  no NVIDIA GPU detected
  30  download failed (connection, HTTP status, truncated body)
  31  checksum mismatch or malformed checksum file
  32  offline cache is missing the archive or its checksum file
  40  corrupt archive or unexpected archive layout
  41  could not replace or promote the install directory
  50  could not copy binaries into the service directory
  51  service failed to start
  52  could not patch the service config file
  60  hardware encode smoke test failed
  70  package manager install failed";

/// Top-level CLI for ffprov.
#[derive(Debug, Parser)]
#[command(name = "ffprov", version)]
#[command(about = "Provision a GPU-accelerated FFmpeg build and wire it into the storage gateway", long_about = None)]
#[command(after_help = EXIT_CODES)]
pub struct Cli {
    /// Read settings from this file instead of the default config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Where the archive comes from.
#[derive(Debug, Default, Args)]
pub struct SourceArgs {
    /// Archive URL; its checksum is read from `<URL>.sha256`.
    #[arg(long, value_name = "URL")]
    pub ffmpeg_url: Option<String>,

    /// Take the archive and its `.sha256` file from this directory; no network access.
    #[arg(long, value_name = "DIR")]
    pub offline_cache: Option<PathBuf>,
}

impl SourceArgs {
    pub fn apply(&self, cfg: &mut ProvisionConfig) {
        if let Some(url) = &self.ffmpeg_url {
            cfg.artifact.url = url.clone();
        }
        if let Some(dir) = &self.offline_cache {
            cfg.artifact.cache_dir = Some(dir.clone());
        }
    }
}

#[derive(Debug, Default, Args)]
pub struct InstallArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Extract the toolchain here.
    #[arg(long, value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Storage gateway install directory; skips registry lookup.
    #[arg(long, visible_alias = "isg-dir", value_name = "DIR")]
    pub service_dir: Option<PathBuf>,

    /// Replace an existing install directory.
    #[arg(long)]
    pub force: bool,

    /// Do not stop, update or restart the storage gateway service.
    #[arg(long, visible_alias = "no-isg")]
    pub no_service: bool,

    /// Install FFmpeg through the system package manager instead of the release archive.
    #[arg(long)]
    pub package_manager: bool,

    /// Sample clip for the hardware encode smoke test.
    #[arg(long, value_name = "FILE")]
    pub sample: Option<PathBuf>,

    /// Leave the system PATH untouched.
    #[arg(long)]
    pub no_path: bool,
}

impl InstallArgs {
    /// Flags win over values from the config file.
    pub fn apply(&self, cfg: &mut ProvisionConfig) {
        self.source.apply(cfg);
        if let Some(dir) = &self.install_dir {
            cfg.artifact.install_dir = dir.clone();
        }
        if let Some(dir) = &self.service_dir {
            cfg.service.install_dir = Some(dir.clone());
        }
        if self.force {
            cfg.artifact.force = true;
        }
        if self.no_service {
            cfg.service.enabled = false;
        }
        if self.package_manager {
            cfg.toolchain.source = ToolchainSource::PackageManager;
        }
        if let Some(sample) = &self.sample {
            cfg.smoke.sample = Some(sample.clone());
        }
        if self.no_path {
            cfg.path.register = false;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the full pipeline: check, fetch, stage, PATH, service integration, smoke test.
    Install(InstallArgs),

    /// Check for an NVIDIA GPU and a recent enough driver.
    Check,

    /// Download (or take from the offline cache) and verify the archive, then print its path.
    Fetch(SourceArgs),

    /// Compute SHA-256 of a file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },

    /// Print a shell completion script.
    Completions {
        /// Target shell.
        shell: Shell,
    },

    /// Print the roff man page.
    Man,
}

fn load_config(path: Option<&Path>) -> Result<ProvisionConfig> {
    match path {
        Some(p) => config::load_from_path(p),
        None => config::load_or_init(),
    }
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let config_path = cli.config.as_deref();

        match cli.command {
            CliCommand::Install(args) => {
                let mut cfg = load_config(config_path)?;
                args.apply(&mut cfg);
                run_install(&cfg)
            }
            CliCommand::Check => {
                let cfg = load_config(config_path)?;
                run_check(&cfg)
            }
            CliCommand::Fetch(args) => {
                let mut cfg = load_config(config_path)?;
                args.apply(&mut cfg);
                run_fetch(&cfg)
            }
            CliCommand::Checksum { path } => run_checksum(&path),
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Man => run_man(),
        }
    }
}

#[cfg(test)]
mod tests;
