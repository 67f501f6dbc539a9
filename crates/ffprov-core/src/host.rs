//! Host-wide state the pipeline reads or mutates outside its own directories.
//!
//! On Windows this is the registry (through `reg.exe`), the machine `Path`
//! value and `net session` for the elevation probe. On Unix the "registry"
//! is a `KEY=VALUE` file, the persistent PATH is a managed profile script and
//! elevation means an effective uid of 0.

use anyhow::{bail, Context, Result};
#[cfg(windows)]
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[cfg(windows)]
use crate::tools::os_args;
use crate::tools::{ProcessRunner, SystemRunner};

pub trait HostEnvironment {
    /// String value `value` under `key`; `None` when either is absent or unreadable.
    fn registry_value(&self, key: &str, value: &str) -> Option<String>;
    /// First `program` (platform executable suffix added) found on the process PATH.
    fn find_on_path(&self, program: &str) -> Option<PathBuf>;
    /// Persistent machine PATH in its platform list syntax.
    fn system_path(&self) -> Result<String>;
    fn set_system_path(&self, value: &str) -> Result<()>;
    /// Tell running processes the environment changed. No-op where unsupported.
    fn broadcast_environment_change(&self) -> Result<()>;
    fn is_elevated(&self) -> bool;
}

/// Separator of PATH-style lists on this platform.
pub const PATH_LIST_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

#[cfg(windows)]
const MACHINE_ENVIRONMENT_KEY: &str =
    r"HKLM\SYSTEM\CurrentControlSet\Control\Session Manager\Environment";

/// The real machine.
#[derive(Debug, Clone)]
pub struct SystemHost<R = SystemRunner> {
    runner: R,
    #[cfg_attr(windows, allow(dead_code))]
    profile_script: PathBuf,
}

impl SystemHost<SystemRunner> {
    pub fn new(profile_script: impl Into<PathBuf>) -> Self {
        Self::with_runner(SystemRunner, profile_script)
    }
}

impl<R: ProcessRunner> SystemHost<R> {
    pub fn with_runner(runner: R, profile_script: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            profile_script: profile_script.into(),
        }
    }

    #[cfg(windows)]
    fn reg_query(&self, key: &str, value: &str) -> Result<Option<String>> {
        let out = self
            .runner
            .run(OsStr::new("reg"), &os_args(["query", key, "/v", value]))?;
        if !out.success() {
            return Ok(None);
        }
        Ok(parse_reg_query(&out.stdout, value))
    }
}

impl<R: ProcessRunner> HostEnvironment for SystemHost<R> {
    #[cfg(windows)]
    fn registry_value(&self, key: &str, value: &str) -> Option<String> {
        match self.reg_query(key, value) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!("registry query {}\\{} failed: {:#}", key, value, e);
                None
            }
        }
    }

    #[cfg(not(windows))]
    fn registry_value(&self, key: &str, value: &str) -> Option<String> {
        let text = std::fs::read_to_string(key).ok()?;
        parse_env_file(&text, value)
    }

    fn find_on_path(&self, program: &str) -> Option<PathBuf> {
        let path = std::env::var_os("PATH")?;
        let file = crate::layout::executable_name(program);
        std::env::split_paths(&path)
            .map(|dir| dir.join(&file))
            .find(|candidate| candidate.is_file())
    }

    #[cfg(windows)]
    fn system_path(&self) -> Result<String> {
        self.reg_query(MACHINE_ENVIRONMENT_KEY, "Path")?
            .context("machine Path value not found")
    }

    #[cfg(not(windows))]
    fn system_path(&self) -> Result<String> {
        match std::fs::read_to_string(&self.profile_script) {
            Ok(text) => Ok(parse_profile_path(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e)
                .with_context(|| format!("read {}", self.profile_script.display())),
        }
    }

    #[cfg(windows)]
    fn set_system_path(&self, value: &str) -> Result<()> {
        let args = os_args([
            "add",
            MACHINE_ENVIRONMENT_KEY,
            "/v",
            "Path",
            "/t",
            "REG_EXPAND_SZ",
            "/d",
            value,
            "/f",
        ]);
        self.runner.run(OsStr::new("reg"), &args)?.into_result("reg")?;
        Ok(())
    }

    #[cfg(not(windows))]
    fn set_system_path(&self, value: &str) -> Result<()> {
        write_profile_script(&self.profile_script, value)
    }

    /// Setting and clearing a throwaway machine variable makes .NET send
    /// `WM_SETTINGCHANGE` without touching `Path` itself.
    #[cfg(windows)]
    fn broadcast_environment_change(&self) -> Result<()> {
        let script = "[Environment]::SetEnvironmentVariable('FFPROV_ENV_SYNC', '1', 'Machine'); \
                      [Environment]::SetEnvironmentVariable('FFPROV_ENV_SYNC', $null, 'Machine')";
        self.runner
            .run(
                OsStr::new("powershell"),
                &os_args(["-NoProfile", "-NonInteractive", "-Command", script]),
            )?
            .into_result("powershell")?;
        Ok(())
    }

    #[cfg(not(windows))]
    fn broadcast_environment_change(&self) -> Result<()> {
        Ok(())
    }

    #[cfg(windows)]
    fn is_elevated(&self) -> bool {
        self.runner
            .run(OsStr::new("net"), &os_args(["session"]))
            .map(|out| out.success())
            .unwrap_or(false)
    }

    #[cfg(unix)]
    fn is_elevated(&self) -> bool {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(any(windows, unix)))]
    fn is_elevated(&self) -> bool {
        false
    }
}

/// Data of `value` in `reg query` output:
/// `    InstallDir    REG_SZ    C:\Program Files\Gateway`.
pub fn parse_reg_query(stdout: &str, value: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let line = line.trim_start();
        let (name, rest) = line.split_once(char::is_whitespace)?;
        if !name.eq_ignore_ascii_case(value) {
            return None;
        }
        let rest = rest.trim_start();
        let (kind, data) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        if !kind.starts_with("REG_") {
            return None;
        }
        Some(data.trim().to_string())
    })
}

/// Value of `key` in a shell-style `KEY=VALUE` file (`export` prefix, quotes and `#` comments allowed).
pub fn parse_env_file(text: &str, key: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let line = line.trim();
        if line.starts_with('#') {
            return None;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (k, v) = line.split_once('=')?;
        if k.trim() != key {
            return None;
        }
        let v = v.trim();
        let unquoted = v
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| v.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
            .unwrap_or(v);
        Some(unquoted.to_string())
    })
}

const PROFILE_HEADER: &str = "# Managed by ffprov. Changes are overwritten.";
const PROFILE_EXPORT_PREFIX: &str = "export PATH=\"$PATH:";

/// Directories the managed profile script appends, as a `:`-joined list.
#[cfg_attr(windows, allow(dead_code))]
fn parse_profile_path(text: &str) -> String {
    text.lines()
        .find_map(|line| {
            line.trim()
                .strip_prefix(PROFILE_EXPORT_PREFIX)
                .and_then(|rest| rest.strip_suffix('"'))
        })
        .unwrap_or_default()
        .to_string()
}

#[cfg_attr(windows, allow(dead_code))]
fn write_profile_script(script: &Path, value: &str) -> Result<()> {
    if value.contains('"') || value.contains('\n') {
        bail!("refusing to write PATH entry containing quotes or newlines: {:?}", value);
    }
    if let Some(parent) = script.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let body = format!("{}\n{}{}\"\n", PROFILE_HEADER, PROFILE_EXPORT_PREFIX, value);
    std::fs::write(script, body).with_context(|| format!("write {}", script.display()))
}
