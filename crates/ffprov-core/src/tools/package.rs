//! System package managers used when the toolchain comes from a package instead of an archive.

use super::process::{os_args, ProcessRunner, SystemRunner, ToolError};
use std::ffi::OsStr;

pub trait PackageManager {
    fn name(&self) -> &str;
    /// Installed version, `None` when the manager itself is absent.
    fn version(&self) -> Result<Option<String>, ToolError>;
    /// Install the package manager itself.
    fn bootstrap(&self) -> Result<(), ToolError>;
    fn install(&self, package: &str) -> Result<(), ToolError>;
}

impl<P: PackageManager + ?Sized> PackageManager for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn version(&self) -> Result<Option<String>, ToolError> {
        (**self).version()
    }

    fn bootstrap(&self) -> Result<(), ToolError> {
        (**self).bootstrap()
    }

    fn install(&self, package: &str) -> Result<(), ToolError> {
        (**self).install(package)
    }
}

fn probe_version<R: ProcessRunner>(runner: &R, program: &str) -> Result<Option<String>, ToolError> {
    match runner.run(OsStr::new(program), &os_args(["--version"])) {
        Ok(out) => {
            let out = out.into_result(program)?;
            let first = out.stdout.lines().next().unwrap_or_default().trim().to_string();
            Ok(Some(first))
        }
        Err(ToolError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

const CHOCO: &str = "choco";
const POWERSHELL: &str = "powershell";
const CHOCO_BOOTSTRAP: &str = "[System.Net.ServicePointManager]::SecurityProtocol = \
    [System.Net.ServicePointManager]::SecurityProtocol -bor 3072; \
    iex ((New-Object System.Net.WebClient).DownloadString('https://community.chocolatey.org/install.ps1'))";

#[derive(Debug, Clone, Default)]
pub struct Chocolatey<R = SystemRunner> {
    runner: R,
}

impl<R: ProcessRunner> Chocolatey<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: ProcessRunner> PackageManager for Chocolatey<R> {
    fn name(&self) -> &str {
        "Chocolatey"
    }

    fn version(&self) -> Result<Option<String>, ToolError> {
        probe_version(&self.runner, CHOCO)
    }

    fn bootstrap(&self) -> Result<(), ToolError> {
        let args = os_args([
            "-NoProfile",
            "-InputFormat",
            "None",
            "-ExecutionPolicy",
            "Bypass",
            "-Command",
            CHOCO_BOOTSTRAP,
        ]);
        self.runner
            .run(OsStr::new(POWERSHELL), &args)?
            .into_result(POWERSHELL)
            .map(|_| ())
    }

    fn install(&self, package: &str) -> Result<(), ToolError> {
        self.runner
            .run(OsStr::new(CHOCO), &os_args(["install", package, "--yes"]))?
            .into_result(CHOCO)
            .map(|_| ())
    }
}

const APT_GET: &str = "apt-get";

#[derive(Debug, Clone, Default)]
pub struct Apt<R = SystemRunner> {
    runner: R,
}

impl<R: ProcessRunner> Apt<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: ProcessRunner> PackageManager for Apt<R> {
    fn name(&self) -> &str {
        "apt"
    }

    fn version(&self) -> Result<Option<String>, ToolError> {
        probe_version(&self.runner, APT_GET)
    }

    fn bootstrap(&self) -> Result<(), ToolError> {
        Err(ToolError::Unsupported(
            "apt-get is part of the base system and cannot be bootstrapped".to_string(),
        ))
    }

    fn install(&self, package: &str) -> Result<(), ToolError> {
        self.runner
            .run(OsStr::new(APT_GET), &os_args(["install", "-y", "-q", package]))?
            .into_result(APT_GET)
            .map(|_| ())
    }
}

pub fn default_package_manager() -> Box<dyn PackageManager> {
    if cfg!(windows) {
        Box::new(Chocolatey::with_runner(SystemRunner))
    } else {
        Box::new(Apt::with_runner(SystemRunner))
    }
}
