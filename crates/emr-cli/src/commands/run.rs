//! Submit a job to the selected backend.

use anyhow::{Context, Result};
use clap::Args;
use emr_config::RunConfig;
use emr_core::executor::{DEFAULT_JOB_NAME, RunOptions};
use emr_core::package::DeploymentPackage;
use emr_core::storage::ObjectStore;
use emr_core::{BackendKind, Error};
use emr_executor::aws::{ContainersClient, EmrClient, S3Store, ServerlessJobClient, load_sdk_config};
use emr_executor::{ClusterRunner, ContainerRunner, JobRunner, ServerlessRunner, run_job};
use emr_package::ProjectPackage;
use std::sync::Arc;
use tracing::info;

use super::{ProjectArgs, TargetArgs, select_backend};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Name of the job run
    #[arg(long, default_value = DEFAULT_JOB_NAME)]
    pub job_name: String,

    /// Comma-delimited arguments passed to the entry point
    #[arg(long, allow_hyphen_values = true)]
    pub job_args: Option<String>,

    /// Extra spark-submit options, e.g. "--conf spark.driver.memory=4g"
    #[arg(long, allow_hyphen_values = true)]
    pub spark_submit_opts: Option<String>,

    /// Job timeout in minutes, enforced by the service
    #[arg(long, allow_negative_numbers = true)]
    pub timeout: Option<i64>,

    /// Wait for the job to finish
    #[arg(long)]
    pub wait: bool,

    /// Print the driver stdout when the job finishes (implies --wait)
    ///
    /// On EMR on EC2 this runs the step in client deploy mode so the driver
    /// output is written to the step log, and it cannot be combined with
    /// projects that distribute archives.
    #[arg(long)]
    pub show_stdout: bool,

    /// Upload the project before running it
    #[arg(long)]
    pub build: bool,
}

impl RunArgs {
    pub fn options(&self, config: &RunConfig) -> RunOptions {
        RunOptions {
            job_name: self.job_name.clone(),
            job_args: self
                .job_args
                .as_deref()
                .map(RunOptions::parse_job_args)
                .unwrap_or_default(),
            submit_opts: self.spark_submit_opts.clone(),
            wait: self.wait,
            show_logs: self.show_stdout,
            logs_uri: config.s3_logs_uri.clone(),
            timeout_minutes: self.timeout,
        }
    }
}

fn job_role(config: &RunConfig) -> Result<String, Error> {
    config
        .job_role
        .clone()
        .ok_or_else(|| Error::Configuration("--job-role is required".to_string()))
}

/// Run the runner's local checks, upload the project when `build_uri` is
/// set, then submit and follow the job.
async fn launch<R>(
    runner: &R,
    project: &ProjectPackage,
    store: &dyn ObjectStore,
    opts: &RunOptions,
    build_uri: Option<&str>,
) -> Result<String>
where
    R: JobRunner,
{
    runner.validate(opts)?;
    if let Some(code_uri) = build_uri {
        project.build()?;
        project
            .upload(store, code_uri)
            .await
            .context("Failed to deploy project")?;
    }
    Ok(run_job(runner, opts).await?)
}

pub async fn run(args: RunArgs, saved: &RunConfig) -> Result<()> {
    let config = args.target.resolve(saved);
    let (backend, address) = select_backend(&config)?;
    let opts = args.options(&config);
    opts.validate()?;

    let build_uri = match (args.build, config.s3_code_uri.as_deref()) {
        (false, _) => None,
        (true, Some(code_uri)) => Some(code_uri),
        (true, None) => {
            return Err(Error::Configuration("--build requires --s3-code-uri".to_string()).into());
        }
    };
    let mut project = args.project.package();
    if let Some(code_uri) = &config.s3_code_uri {
        project = project.with_code_uri(code_uri);
    }
    let project = Arc::new(project);
    let package: Arc<dyn DeploymentPackage> = project.clone();

    let sdk = load_sdk_config(config.region.as_deref(), config.profile.as_deref()).await;
    let store: Arc<dyn ObjectStore> = Arc::new(S3Store::new(&sdk));

    info!(backend = %backend, address = %address, "Running job");
    let run_id = match backend {
        BackendKind::Serverless => {
            let client = Arc::new(ServerlessJobClient::new(&sdk));
            let runner =
                ServerlessRunner::new(address, job_role(&config)?, package, client, store.clone());
            launch(&runner, &project, store.as_ref(), &opts, build_uri).await?
        }
        BackendKind::Cluster => {
            let client = Arc::new(EmrClient::new(&sdk));
            let runner = ClusterRunner::new(address, package, client, store.clone());
            launch(&runner, &project, store.as_ref(), &opts, build_uri).await?
        }
        BackendKind::Containers => {
            let client = Arc::new(ContainersClient::new(&sdk));
            let mut runner =
                ContainerRunner::new(address, job_role(&config)?, package, client, store.clone());
            if let Some(label) = &config.release_label {
                runner = runner.with_release_label(label);
            }
            launch(&runner, &project, store.as_ref(), &opts, build_uri).await?
        }
    };

    println!("{}", run_id);
    Ok(())
}
