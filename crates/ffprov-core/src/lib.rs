pub mod checksum;
pub mod config;
pub mod error;
pub mod fetch;
pub mod host;
pub mod layout;
pub mod logging;
pub mod path_env;
pub mod paths;
pub mod pipeline;
pub mod prereq;
pub mod service;
pub mod smoke;
pub mod stage;
pub mod toolchain;
pub mod tools;
pub mod url_model;

pub use error::{exit, ProvisionError};
pub use pipeline::{Pipeline, PipelineReport, Toolbox};
