//! Error types for emr-run.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} environment is not supported")]
    UnsupportedBackend(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("job submission failed: {0}")]
    Submission(String),

    #[error("job {run_id} finished in state {state}: {detail}")]
    JobFailed {
        run_id: String,
        state: String,
        detail: String,
    },

    #[error("timed out after {waited:?} waiting for logs at {uri}")]
    LogTimeout { uri: String, waited: Duration },

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("code location has not been set, deploy the project first: {0}")]
    NotDeployed(String),

    #[error("remote call failed: {0}")]
    Remote(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit status for a command that ended with this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

pub type Result<T> = std::result::Result<T, Error>;
