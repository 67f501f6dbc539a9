//! Scripted stand-ins for every host collaborator the pipeline uses.

use anyhow::Result;
use ffprov_core::host::HostEnvironment;
use ffprov_core::tools::{
    GpuInfo, GpuQuery, PackageManager, ProcessRunner, ServiceControl, ServiceStatus, ToolError,
    ToolOutput,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

pub struct FakeHost {
    pub elevated: bool,
    pub registry: HashMap<(String, String), String>,
    pub system_path: RefCell<String>,
    pub on_path: HashMap<String, PathBuf>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            elevated: true,
            registry: HashMap::new(),
            system_path: RefCell::new(String::new()),
            on_path: HashMap::new(),
        }
    }
}

impl HostEnvironment for FakeHost {
    fn registry_value(&self, key: &str, value: &str) -> Option<String> {
        self.registry.get(&(key.to_string(), value.to_string())).cloned()
    }

    fn find_on_path(&self, program: &str) -> Option<PathBuf> {
        self.on_path.get(program).cloned()
    }

    fn system_path(&self) -> Result<String> {
        Ok(self.system_path.borrow().clone())
    }

    fn set_system_path(&self, value: &str) -> Result<()> {
        *self.system_path.borrow_mut() = value.to_string();
        Ok(())
    }

    fn broadcast_environment_change(&self) -> Result<()> {
        Ok(())
    }

    fn is_elevated(&self) -> bool {
        self.elevated
    }
}

/// `None` means no device.
pub struct FakeGpu(pub Option<(&'static str, &'static str)>);

impl GpuQuery for FakeGpu {
    fn query(&self) -> Result<GpuInfo, ToolError> {
        match self.0 {
            Some((name, driver)) => Ok(GpuInfo {
                name: name.to_string(),
                driver_version: driver.to_string(),
            }),
            None => Err(ToolError::Failed {
                program: "nvidia-smi".to_string(),
                status: "exit code 6".to_string(),
                detail: "No devices were found".to_string(),
            }),
        }
    }
}

/// Records every call; reports stopped after `stop_after_queries` queries.
#[derive(Default)]
pub struct FakeService {
    pub calls: RefCell<Vec<String>>,
    pub stop_after_queries: Option<usize>,
    pub start_fails: bool,
    pub queries: Cell<usize>,
}

impl FakeService {
    pub fn stopping_after(queries: usize) -> Self {
        Self {
            stop_after_queries: Some(queries),
            ..Self::default()
        }
    }

    pub fn never_stopping() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ServiceControl for FakeService {
    fn stop(&self, name: &str) -> Result<(), ToolError> {
        self.calls.borrow_mut().push(format!("stop {}", name));
        Ok(())
    }

    fn query(&self, name: &str) -> Result<ServiceStatus, ToolError> {
        self.calls.borrow_mut().push(format!("query {}", name));
        self.queries.set(self.queries.get() + 1);
        match self.stop_after_queries {
            Some(n) if self.queries.get() >= n => Ok(ServiceStatus::Stopped),
            _ => Ok(ServiceStatus::NotStopped),
        }
    }

    fn start(&self, name: &str) -> Result<(), ToolError> {
        self.calls.borrow_mut().push(format!("start {}", name));
        if self.start_fails {
            return Err(ToolError::Failed {
                program: "sc".to_string(),
                status: "exit code 1053".to_string(),
                detail: "The service did not respond".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePackages {
    pub calls: RefCell<Vec<String>>,
}

impl PackageManager for FakePackages {
    fn name(&self) -> &str {
        "fake-pm"
    }

    fn version(&self) -> Result<Option<String>, ToolError> {
        Ok(Some("1.0".to_string()))
    }

    fn bootstrap(&self) -> Result<(), ToolError> {
        self.calls.borrow_mut().push("bootstrap".to_string());
        Ok(())
    }

    fn install(&self, package: &str) -> Result<(), ToolError> {
        self.calls.borrow_mut().push(format!("install {}", package));
        Ok(())
    }
}

/// Answers every command with the same output and records the command lines.
pub struct FakeRunner {
    pub reply: ToolOutput,
    pub commands: RefCell<Vec<Vec<OsString>>>,
}

impl FakeRunner {
    pub fn encoder_ok() -> Self {
        Self::replying(0, "Stream mapping: h264 -> h264_nvenc\n[h264_nvenc] NVENC session opened\n")
    }

    pub fn replying(code: i32, stderr: &str) -> Self {
        Self {
            reply: ToolOutput {
                code: Some(code),
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
            commands: RefCell::new(Vec::new()),
        }
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, program: &OsStr, args: &[OsString]) -> Result<ToolOutput, ToolError> {
        let mut cmd = vec![program.to_os_string()];
        cmd.extend(args.iter().cloned());
        self.commands.borrow_mut().push(cmd);
        Ok(self.reply.clone())
    }
}

/// A runner for code paths that must never spawn anything.
pub struct NoRunner;

impl ProcessRunner for NoRunner {
    fn run(&self, program: &OsStr, _args: &[OsString]) -> Result<ToolOutput, ToolError> {
        Err(ToolError::Spawn {
            program: program.to_string_lossy().into_owned(),
            source: std::io::Error::other("unexpected process launch"),
        })
    }
}
