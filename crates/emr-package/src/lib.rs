//! Project packages for emr-run.
//!
//! Provides the deployment package variants:
//! - Single entry-point file
//! - Multiple Python files zipped into `pyfiles.zip`
//! - Poetry projects with a packed virtualenv archive

pub mod project;

pub use emr_core::package::DeploymentPackage;
pub use project::{ProjectKind, ProjectPackage};
