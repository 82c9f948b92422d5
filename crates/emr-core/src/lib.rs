//! Core domain types and traits for emr-run.
//!
//! This crate contains:
//! - Backend identifiers and the Spark parameter model
//! - The deployment package capability
//! - Job state vocabularies, run options and remote-client traits
//! - Object storage abstractions and S3 URI handling

pub mod backend;
pub mod error;
pub mod executor;
pub mod package;
pub mod params;
pub mod storage;

pub use backend::BackendKind;
pub use error::{Error, Result};
pub use params::ParameterSet;
