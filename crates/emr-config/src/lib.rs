//! KDL configuration for emr-run.
//!
//! This crate handles the saved run defaults stored in `.emr/config.kdl`.

pub mod error;
pub mod run;

pub use error::{ConfigError, ConfigResult};
pub use run::{DEFAULT_CONFIG_PATH, RunConfig};
