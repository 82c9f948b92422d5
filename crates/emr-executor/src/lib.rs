//! Job submission backends for emr-run.
//!
//! Provides:
//! - A shared run driver over the [`JobRunner`] capability
//! - Adapters for EMR Serverless, EMR on EC2 and EMR on EKS
//! - Status polling and driver log retrieval
//! - AWS SDK clients implementing the remote-client traits

pub mod aws;
pub mod cluster;
pub mod containers;
pub mod logs;
pub mod poll;
pub mod runner;
pub mod serverless;

#[cfg(test)]
pub(crate) mod testing;

pub use cluster::ClusterRunner;
pub use containers::ContainerRunner;
pub use runner::{JobRunner, RunPlan, RunReport, execute, run_job};
pub use serverless::ServerlessRunner;
