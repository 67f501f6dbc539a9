//! Config and state locations.
//!
//! XDG base directories on Unix (via the `xdg` crate), `%ProgramData%\ffprov`
//! elsewhere.

use anyhow::Result;
use std::path::PathBuf;

pub const APP_PREFIX: &str = "ffprov";

const CONFIG_FILE: &str = "config.toml";

/// Path of `config.toml`, creating its parent directory if needed.
#[cfg(unix)]
pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_PREFIX)?;
    Ok(xdg_dirs.place_config_file(CONFIG_FILE)?)
}

/// Path of a file in the state directory, creating the directory if needed.
#[cfg(unix)]
pub fn state_file(name: &str) -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_PREFIX)?;
    Ok(xdg_dirs.place_state_file(name)?)
}

#[cfg(not(unix))]
pub fn config_path() -> Result<PathBuf> {
    Ok(program_data_dir()?.join(CONFIG_FILE))
}

#[cfg(not(unix))]
pub fn state_file(name: &str) -> Result<PathBuf> {
    Ok(program_data_dir()?.join(name))
}

#[cfg(not(unix))]
fn program_data_dir() -> Result<PathBuf> {
    let base = std::env::var_os("ProgramData")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"));
    let dir = base.join(APP_PREFIX);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
