//! Host service control: `sc` on Windows, `systemctl` elsewhere.

use super::process::{os_args, ProcessRunner, SystemRunner, ToolError};
use std::ffi::OsStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Stopped,
    NotStopped,
}

pub trait ServiceControl {
    /// Request a stop. Callers tolerate failure (the service may already be stopped).
    fn stop(&self, name: &str) -> Result<(), ToolError>;
    fn query(&self, name: &str) -> Result<ServiceStatus, ToolError>;
    fn start(&self, name: &str) -> Result<(), ToolError>;
}

impl<S: ServiceControl + ?Sized> ServiceControl for Box<S> {
    fn stop(&self, name: &str) -> Result<(), ToolError> {
        (**self).stop(name)
    }

    fn query(&self, name: &str) -> Result<ServiceStatus, ToolError> {
        (**self).query(name)
    }

    fn start(&self, name: &str) -> Result<(), ToolError> {
        (**self).start(name)
    }
}

const SC: &str = "sc";

/// Windows Service Control Manager through `sc.exe`.
#[derive(Debug, Clone, Default)]
pub struct WindowsServiceControl<R = SystemRunner> {
    runner: R,
}

impl<R: ProcessRunner> WindowsServiceControl<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    fn sc(&self, verb: &str, name: &str) -> Result<super::ToolOutput, ToolError> {
        self.runner.run(OsStr::new(SC), &os_args([verb, name]))
    }
}

impl<R: ProcessRunner> ServiceControl for WindowsServiceControl<R> {
    fn stop(&self, name: &str) -> Result<(), ToolError> {
        self.sc("stop", name)?.into_result(SC).map(|_| ())
    }

    /// `sc query` prints `STATE : 1  STOPPED` once the service is down.
    /// A non-zero exit (unknown service) still yields text without the marker.
    fn query(&self, name: &str) -> Result<ServiceStatus, ToolError> {
        let out = self.sc("query", name)?;
        if out.stdout.contains("STOPPED") {
            Ok(ServiceStatus::Stopped)
        } else {
            Ok(ServiceStatus::NotStopped)
        }
    }

    fn start(&self, name: &str) -> Result<(), ToolError> {
        self.sc("start", name)?.into_result(SC).map(|_| ())
    }
}

const SYSTEMCTL: &str = "systemctl";

/// systemd units through `systemctl`.
#[derive(Debug, Clone, Default)]
pub struct SystemdServiceControl<R = SystemRunner> {
    runner: R,
}

impl<R: ProcessRunner> SystemdServiceControl<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    fn systemctl(&self, verb: &str, name: &str) -> Result<super::ToolOutput, ToolError> {
        self.runner.run(OsStr::new(SYSTEMCTL), &os_args([verb, name]))
    }
}

impl<R: ProcessRunner> ServiceControl for SystemdServiceControl<R> {
    fn stop(&self, name: &str) -> Result<(), ToolError> {
        self.systemctl("stop", name)?.into_result(SYSTEMCTL).map(|_| ())
    }

    /// `is-active` exits non-zero for every state but `active`, so only stdout is read.
    fn query(&self, name: &str) -> Result<ServiceStatus, ToolError> {
        let out = self.systemctl("is-active", name)?;
        match out.stdout.trim() {
            "inactive" | "failed" => Ok(ServiceStatus::Stopped),
            "" => Err(ToolError::Parse {
                program: SYSTEMCTL.to_string(),
                detail: format!("no state reported for {} ({})", name, out.detail()),
            }),
            _ => Ok(ServiceStatus::NotStopped),
        }
    }

    fn start(&self, name: &str) -> Result<(), ToolError> {
        self.systemctl("start", name)?.into_result(SYSTEMCTL).map(|_| ())
    }
}

/// Service control for the platform this binary was built for.
pub fn default_service_control() -> Box<dyn ServiceControl> {
    if cfg!(windows) {
        Box::new(WindowsServiceControl::with_runner(SystemRunner))
    } else {
        Box::new(SystemdServiceControl::with_runner(SystemRunner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolOutput;
    use std::cell::RefCell;
    use std::ffi::OsString;

    struct Recorder {
        calls: RefCell<Vec<String>>,
        reply: ToolOutput,
    }

    impl Recorder {
        fn new(code: i32, stdout: &str) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                reply: ToolOutput { code: Some(code), stdout: stdout.into(), stderr: String::new() },
            }
        }
    }

    impl ProcessRunner for Recorder {
        fn run(&self, program: &OsStr, args: &[OsString]) -> Result<ToolOutput, ToolError> {
            let mut line = program.to_string_lossy().into_owned();
            for a in args {
                line.push(' ');
                line.push_str(&a.to_string_lossy());
            }
            self.calls.borrow_mut().push(line);
            Ok(self.reply.clone())
        }
    }

    const SC_STOPPED: &str = "SERVICE_NAME: iconik-storage-gateway\r\n        TYPE               : 10  WIN32_OWN_PROCESS\r\n        STATE              : 1  STOPPED\r\n";
    const SC_RUNNING: &str = "SERVICE_NAME: iconik-storage-gateway\r\n        STATE              : 4  RUNNING\r\n";

    #[test]
    fn sc_query_detects_stopped() {
        let runner = Recorder::new(0, SC_STOPPED);
        let sc = WindowsServiceControl::with_runner(&runner);
        assert_eq!(sc.query("iconik-storage-gateway").unwrap(), ServiceStatus::Stopped);
        assert_eq!(runner.calls.borrow()[0], "sc query iconik-storage-gateway");

        let sc = WindowsServiceControl::with_runner(Recorder::new(0, SC_RUNNING));
        assert_eq!(sc.query("x").unwrap(), ServiceStatus::NotStopped);
    }

    #[test]
    fn sc_stop_failure_is_reported() {
        let runner = Recorder::new(1062, "The service has not been started.");
        let sc = WindowsServiceControl::with_runner(&runner);
        assert!(matches!(sc.stop("svc"), Err(ToolError::Failed { .. })));
        assert_eq!(runner.calls.borrow().as_slice(), ["sc stop svc"]);
    }

    #[test]
    fn systemctl_states() {
        for (stdout, code, expected) in [
            ("inactive\n", 3, ServiceStatus::Stopped),
            ("failed\n", 3, ServiceStatus::Stopped),
            ("active\n", 0, ServiceStatus::NotStopped),
            ("deactivating\n", 3, ServiceStatus::NotStopped),
        ] {
            let ctl = SystemdServiceControl::with_runner(Recorder::new(code, stdout));
            assert_eq!(ctl.query("gw").unwrap(), expected, "state {:?}", stdout);
        }
        let ctl = SystemdServiceControl::with_runner(Recorder::new(1, ""));
        assert!(ctl.query("gw").is_err());
    }

    #[test]
    fn systemctl_start_uses_unit_name() {
        let runner = Recorder::new(0, "");
        let ctl = SystemdServiceControl::with_runner(&runner);
        ctl.start("iconik-storage-gateway").unwrap();
        assert_eq!(runner.calls.borrow()[0], "systemctl start iconik-storage-gateway");
    }
}
