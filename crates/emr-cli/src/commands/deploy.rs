//! Upload a project to S3.

use anyhow::{Context, Result};
use clap::Args;
use emr_config::RunConfig;
use emr_core::Error;
use emr_executor::aws::{S3Store, load_sdk_config};
use tracing::info;

use super::{ProjectArgs, TargetArgs};

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub project: ProjectArgs,
}

pub async fn deploy(args: DeployArgs, saved: &RunConfig) -> Result<()> {
    let config = args.target.resolve(saved);
    let code_uri = config
        .s3_code_uri
        .as_deref()
        .ok_or_else(|| Error::Configuration("--s3-code-uri is required".to_string()))?;

    let sdk = load_sdk_config(config.region.as_deref(), config.profile.as_deref()).await;
    let store = S3Store::new(&sdk);

    let mut package = args.project.package();
    let entrypoint = package
        .deploy(&store, code_uri)
        .await
        .with_context(|| format!("Failed to deploy project to {}", code_uri))?;

    info!(kind = %package.kind(), entrypoint = %entrypoint, "Project deployed");
    println!("{}", entrypoint);
    Ok(())
}
