//! EMR Serverless backend.

use async_trait::async_trait;
use emr_core::executor::{
    JobClient, RunOptions, RunStatus, ServerlessClient, ServerlessJobRequest, ServerlessState,
};
use emr_core::package::DeploymentPackage;
use emr_core::storage::{ObjectStore, join_uri};
use emr_core::{BackendKind, Error, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::poll::DEFAULT_POLL_INTERVAL;
use crate::runner::{self, JobRunner, RunPlan};

/// Service default for `executionTimeoutMinutes` (12 hours).
pub const DEFAULT_EXECUTION_TIMEOUT_MINUTES: i64 = 12 * 60;

/// Runs jobs on an EMR Serverless application.
pub struct ServerlessRunner {
    application_id: String,
    job_role: String,
    package: Arc<dyn DeploymentPackage>,
    client: Arc<dyn ServerlessClient>,
    store: Arc<dyn ObjectStore>,
    poll_interval: Duration,
}

impl ServerlessRunner {
    pub fn new(
        application_id: impl Into<String>,
        job_role: impl Into<String>,
        package: Arc<dyn DeploymentPackage>,
        client: Arc<dyn ServerlessClient>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            application_id: application_id.into(),
            job_role: job_role.into(),
            package,
            client,
            store,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Build the `StartJobRun` request for these options.
    pub fn build_request(&self, opts: &RunOptions, plan: &RunPlan) -> Result<ServerlessJobRequest> {
        let rendered = self.package.parameters().render_for(BackendKind::Serverless);
        let params = opts.submit_parameters(&rendered);

        Ok(ServerlessJobRequest {
            application_id: self.application_id.clone(),
            execution_role_arn: self.job_role.clone(),
            name: plan.job_name.clone(),
            entry_point: self.package.entrypoint_uri()?,
            entry_point_arguments: opts.job_args.clone(),
            spark_submit_parameters: (!params.is_empty()).then_some(params),
            log_uri: opts.logs_uri.clone(),
            execution_timeout_minutes: opts
                .timeout_minutes
                .unwrap_or(DEFAULT_EXECUTION_TIMEOUT_MINUTES),
        })
    }

    pub async fn run_job(&self, opts: &RunOptions) -> Result<String> {
        runner::run_job(self, opts).await
    }
}

#[async_trait]
impl JobRunner for ServerlessRunner {
    type State = ServerlessState;

    fn backend(&self) -> BackendKind {
        BackendKind::Serverless
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    fn validate(&self, opts: &RunOptions) -> Result<()> {
        opts.validate()?;
        if self.application_id.is_empty() {
            return Err(Error::Configuration(
                "an application id is required".to_string(),
            ));
        }
        if opts.show_logs && opts.logs_uri.is_none() {
            return Err(Error::Configuration(
                "--show-stdout requires --s3-logs-uri to be set".to_string(),
            ));
        }
        Ok(())
    }

    async fn preflight(&self, opts: &RunOptions) -> Result<RunPlan> {
        self.validate(opts)?;

        Ok(RunPlan {
            job_name: opts.job_name.clone(),
            log_base: opts.logs_uri.clone(),
            release_label: None,
        })
    }

    async fn submit(&self, opts: &RunOptions, plan: &RunPlan) -> Result<String> {
        let request = self.build_request(opts, plan)?;
        self.client.submit(&request).await
    }

    async fn status(&self, run_id: &str) -> Result<RunStatus<ServerlessState>> {
        self.client.status(&self.application_id, run_id).await
    }

    fn log_location(&self, run_id: &str, plan: &RunPlan) -> Result<String> {
        let base = plan
            .log_base
            .as_deref()
            .ok_or_else(|| Error::Configuration("no log location for this run".to_string()))?;
        Ok(join_uri(
            base,
            &[
                "applications",
                &self.application_id,
                "jobs",
                run_id,
                "SPARK_DRIVER",
                "stdout.gz",
            ],
        ))
    }
}
