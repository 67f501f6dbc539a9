use ffprov_core::{exit, logging, ProvisionError};

mod cli;

use crate::cli::CliCommand;

fn main() {
    // Initialize logging as early as possible; fall back to stderr if the log file is unusable.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable: {:#}", err);
    }

    if let Err(err) = CliCommand::run_from_args() {
        eprintln!("ffprov error: {:#}", err);
        let code = err
            .downcast_ref::<ProvisionError>()
            .map(ProvisionError::exit_code)
            .unwrap_or(exit::GENERAL);
        std::process::exit(code);
    }
}
