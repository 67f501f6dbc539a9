//! External collaborators invoked as subprocesses.
//!
//! Each collaborator sits behind a narrow trait so the pipeline never depends on
//! exact CLI syntax; the real implementations are thin wrappers over a
//! [`ProcessRunner`], which tests replace with scripted output.

mod gpu;
mod package;
mod process;
mod service;

pub use gpu::{parse_gpu_csv, GpuInfo, GpuQuery, NvidiaSmi};
pub use package::{default_package_manager, Apt, Chocolatey, PackageManager};
pub use process::{os_args, ProcessRunner, SystemRunner, ToolError, ToolOutput};
pub use service::{
    default_service_control, ServiceControl, ServiceStatus, SystemdServiceControl,
    WindowsServiceControl,
};
