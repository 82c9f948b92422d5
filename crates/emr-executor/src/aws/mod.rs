//! AWS SDK implementations of the client and storage traits.

mod containers;
mod emr;
mod s3;
mod serverless;

pub use containers::ContainersClient;
pub use emr::EmrClient;
pub use s3::S3Store;
pub use serverless::ServerlessJobClient;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::error::DisplayErrorContext;
use tracing::debug;

/// Load shared AWS configuration, honouring an explicit region and profile.
pub async fn load_sdk_config(region: Option<&str>, profile: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    let config = loader.load().await;
    debug!(region = ?config.region(), "Loaded AWS configuration");
    config
}

/// Render an SDK error with its full source chain.
pub(crate) fn describe<E: std::error::Error>(err: E) -> String {
    DisplayErrorContext(err).to_string()
}
