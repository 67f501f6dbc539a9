//! Blocking subprocess execution with captured output.

use std::ffi::{OsStr, OsString};
use std::io;
use std::process::Command;
use thiserror::Error;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turns a non-zero exit into [`ToolError::Failed`].
    pub fn into_result(self, program: &str) -> Result<ToolOutput, ToolError> {
        if self.success() {
            return Ok(self);
        }
        Err(ToolError::Failed {
            program: program.to_string(),
            status: self.status_text(),
            detail: self.detail(),
        })
    }

    pub fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "a signal".to_string(),
        }
    }

    /// Most useful diagnostic text: stderr, else stdout, trimmed.
    pub fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{program} not found")]
    NotFound { program: String },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {detail}")]
    Failed {
        program: String,
        status: String,
        detail: String,
    },

    #[error("unexpected output from {program}: {detail}")]
    Parse { program: String, detail: String },

    #[error("{0}")]
    Unsupported(String),
}

/// Runs a program to completion. No timeout: a hung process blocks the caller.
pub trait ProcessRunner {
    fn run(&self, program: &OsStr, args: &[OsString]) -> Result<ToolOutput, ToolError>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, program: &OsStr, args: &[OsString]) -> Result<ToolOutput, ToolError> {
        (**self).run(program, args)
    }
}

/// Real runner on `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &OsStr, args: &[OsString]) -> Result<ToolOutput, ToolError> {
        let shown = program.to_string_lossy().into_owned();
        tracing::debug!(program = %shown, ?args, "running");
        let output = Command::new(program).args(args).output().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ToolError::NotFound { program: shown.clone() }
            } else {
                ToolError::Spawn { program: shown.clone(), source: e }
            }
        })?;
        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Collects anything string- or path-like into an argument vector.
pub fn os_args<I, S>(items: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    items.into_iter().map(|s| s.as_ref().to_os_string()).collect()
}
