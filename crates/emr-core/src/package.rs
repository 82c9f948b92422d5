//! Deployment package capability.
//!
//! A deployment package is "the code to run": it knows where its entry point
//! lives once uploaded and which Spark parameters it needs.

use crate::{ParameterSet, Result};

/// A runnable unit of code consumed by the backend adapters.
pub trait DeploymentPackage: Send + Sync {
    /// Fully-qualified remote URI of the entry point, e.g. `s3://bucket/code/main.py`.
    ///
    /// Fails with [`crate::Error::NotDeployed`] if the code location is unknown.
    fn entrypoint_uri(&self) -> Result<String>;

    /// Spark parameters this package contributes.
    fn parameters(&self) -> ParameterSet {
        ParameterSet::new()
    }
}
