//! `ffprov fetch` – acquire and verify the archive without installing it.

use anyhow::Result;
use ffprov_core::config::ProvisionConfig;
use ffprov_core::pipeline;

pub fn run_fetch(cfg: &ProvisionConfig) -> Result<()> {
    let artifact = pipeline::fetch_verified(cfg)?;
    tracing::info!(
        sha256 = %artifact.descriptor.computed,
        cached = artifact.from_cache,
        "archive verified"
    );
    println!("{}", artifact.path.display());
    Ok(())
}
