//! CLI command implementations.

pub mod config;
pub mod deploy;
pub mod run;

use clap::Args;
use emr_config::RunConfig;
use emr_core::{BackendKind, Error};
use emr_package::project::resolve_in;
use emr_package::{ProjectKind, ProjectPackage};
use std::path::PathBuf;

/// Where jobs run and where their code and logs live.
///
/// Every value falls back to the saved config when omitted.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// EMR Serverless application ID
    #[arg(long)]
    pub application_id: Option<String>,

    /// EMR on EC2 cluster ID
    #[arg(long)]
    pub cluster_id: Option<String>,

    /// EMR on EKS virtual cluster ID
    #[arg(long)]
    pub virtual_cluster_id: Option<String>,

    /// IAM role ARN the job runs as (EMR Serverless and EMR on EKS)
    #[arg(long)]
    pub job_role: Option<String>,

    /// S3 prefix the project is uploaded to
    #[arg(long)]
    pub s3_code_uri: Option<String>,

    /// S3 prefix the job writes its logs to
    #[arg(long)]
    pub s3_logs_uri: Option<String>,

    /// EMR on EKS release label, defaults to the latest Spark release
    #[arg(long)]
    pub release_label: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// AWS shared config profile
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,
}

impl TargetArgs {
    fn has_address(&self) -> bool {
        self.application_id.is_some() || self.cluster_id.is_some() || self.virtual_cluster_id.is_some()
    }

    /// Overlay these flags onto the saved config.
    ///
    /// An id given on the command line replaces every saved id, so a saved
    /// application never clashes with an explicit `--cluster-id`.
    pub fn resolve(&self, saved: &RunConfig) -> RunConfig {
        let mut config = saved.clone();
        if self.has_address() {
            config.application_id = None;
            config.cluster_id = None;
            config.virtual_cluster_id = None;
        }
        config.merge(RunConfig {
            application_id: self.application_id.clone(),
            cluster_id: self.cluster_id.clone(),
            virtual_cluster_id: self.virtual_cluster_id.clone(),
            job_role: self.job_role.clone(),
            s3_code_uri: self.s3_code_uri.clone(),
            s3_logs_uri: self.s3_logs_uri.clone(),
            release_label: self.release_label.clone(),
            region: self.region.clone(),
            profile: self.profile.clone(),
        });
        config
    }
}

/// The local project to package.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Entry point file, relative to the project directory
    #[arg(long)]
    pub entry_point: PathBuf,

    /// How the project ships its code: simple, python-files or poetry
    #[arg(long, default_value = "simple")]
    pub project_type: ProjectKind,

    /// Project directory
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Build output directory, relative to the project directory
    #[arg(long, default_value = "dist")]
    pub dist_dir: PathBuf,
}

impl ProjectArgs {
    pub fn package(&self) -> ProjectPackage {
        ProjectPackage::new(
            self.project_type,
            resolve_in(&self.project_dir, &self.entry_point),
        )
        .with_project_dir(&self.project_dir)
        .with_dist_dir(resolve_in(&self.project_dir, &self.dist_dir))
    }
}

/// Pick the backend from the single addressing id in `config`.
pub fn select_backend(config: &RunConfig) -> Result<(BackendKind, String), Error> {
    let candidates = [
        (BackendKind::Serverless, &config.application_id),
        (BackendKind::Cluster, &config.cluster_id),
        (BackendKind::Containers, &config.virtual_cluster_id),
    ];
    let mut present = candidates
        .into_iter()
        .filter_map(|(backend, id)| id.as_ref().map(|id| (backend, id.clone())));

    match (present.next(), present.next()) {
        (Some(target), None) => Ok(target),
        _ => Err(Error::Configuration(
            "exactly one of --application-id, --cluster-id or --virtual-cluster-id is required"
                .to_string(),
        )),
    }
}
