//! CLI command handlers, one per file.

mod check;
mod checksum;
mod completions;
mod fetch;
mod install;

pub use check::run_check;
pub use checksum::run_checksum;
pub use completions::{run_completions, run_man};
pub use fetch::run_fetch;
pub use install::run_install;
