//! EMR on EC2 backend: jobs run as `spark-submit` steps on a running cluster.

use async_trait::async_trait;
use emr_core::executor::{
    ClusterClient, ClusterStepRequest, JobClient, RunOptions, RunStatus, StepState,
};
use emr_core::package::DeploymentPackage;
use emr_core::storage::{ObjectStore, join_uri};
use emr_core::{BackendKind, Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::logs::{self, LOG_WAIT_DELAY, LogWait};
use crate::poll::DEFAULT_POLL_INTERVAL;
use crate::runner::{self, JobRunner, RunPlan};

pub const COMMAND_RUNNER_JAR: &str = "command-runner.jar";

/// Steps never stop the cluster on failure.
pub const ACTION_ON_FAILURE: &str = "CONTINUE";

/// Runs jobs as steps on an EMR on EC2 cluster.
pub struct ClusterRunner {
    cluster_id: String,
    package: Arc<dyn DeploymentPackage>,
    client: Arc<dyn ClusterClient>,
    store: Arc<dyn ObjectStore>,
    poll_interval: Duration,
    log_wait_delay: Duration,
}

impl ClusterRunner {
    pub fn new(
        cluster_id: impl Into<String>,
        package: Arc<dyn DeploymentPackage>,
        client: Arc<dyn ClusterClient>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            package,
            client,
            store,
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_wait_delay: LOG_WAIT_DELAY,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_log_wait_delay(mut self, delay: Duration) -> Self {
        self.log_wait_delay = delay;
        self
    }

    fn spark_parameters(&self, opts: &RunOptions) -> String {
        let rendered = self.package.parameters().render_for(BackendKind::Cluster);
        opts.submit_parameters(&rendered)
    }

    /// Build the `AddJobFlowSteps` step for these options.
    ///
    /// Printing the driver stdout needs the driver on the primary node, so
    /// `show_logs` runs the step in client mode.
    pub fn build_request(&self, opts: &RunOptions, plan: &RunPlan) -> Result<ClusterStepRequest> {
        let deploy_mode = if opts.show_logs { "client" } else { "cluster" };

        let mut args = vec![
            "spark-submit".to_string(),
            "--deploy-mode".to_string(),
            deploy_mode.to_string(),
        ];
        args.extend(
            self.spark_parameters(opts)
                .split_whitespace()
                .map(str::to_string),
        );
        args.push(self.package.entrypoint_uri()?);
        args.extend(opts.job_args.iter().cloned());

        Ok(ClusterStepRequest {
            cluster_id: self.cluster_id.clone(),
            name: plan.job_name.clone(),
            action_on_failure: ACTION_ON_FAILURE.to_string(),
            jar: COMMAND_RUNNER_JAR.to_string(),
            args,
        })
    }

    async fn resolve_log_base(&self, opts: &RunOptions) -> Result<String> {
        if let Some(uri) = &opts.logs_uri {
            return Ok(uri.clone());
        }
        let uri = self.client.log_uri(&self.cluster_id).await?.ok_or_else(|| {
            Error::Configuration(format!(
                "No logs location set for cluster {}",
                self.cluster_id
            ))
        })?;
        debug!(cluster_id = %self.cluster_id, log_uri = %uri, "Using cluster log location");
        Ok(normalize_log_uri(&uri))
    }

    pub async fn run_job(&self, opts: &RunOptions) -> Result<String> {
        runner::run_job(self, opts).await
    }
}

/// Cluster log URIs are reported with the legacy `s3n:` scheme.
fn normalize_log_uri(uri: &str) -> String {
    match uri.strip_prefix("s3n:") {
        Some(rest) => format!("s3:{}", rest),
        None => uri.to_string(),
    }
}

/// Whether the spark parameters ship archives to the executors.
fn uses_archives(parameters: &str) -> bool {
    parameters.split_whitespace().any(|token| {
        token == "--archives" || token.starts_with("--archives=") || token.starts_with("spark.archives=")
    })
}

#[async_trait]
impl JobRunner for ClusterRunner {
    type State = StepState;

    fn backend(&self) -> BackendKind {
        BackendKind::Cluster
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    fn validate(&self, opts: &RunOptions) -> Result<()> {
        opts.validate()?;
        if self.cluster_id.is_empty() {
            return Err(Error::Configuration("a cluster id is required".to_string()));
        }
        if opts.show_logs && uses_archives(&self.spark_parameters(opts)) {
            return Err(Error::Configuration(
                "--show-stdout is not compatible with projects that use archives, \
                 use EMR Serverless or EMR on EKS instead"
                    .to_string(),
            ));
        }
        Ok(())
    }

    async fn preflight(&self, opts: &RunOptions) -> Result<RunPlan> {
        self.validate(opts)?;

        let log_base = if opts.show_logs {
            warn!(
                cluster_id = %self.cluster_id,
                "--show-stdout runs the step in client deploy mode"
            );
            Some(self.resolve_log_base(opts).await?)
        } else {
            None
        };

        Ok(RunPlan {
            job_name: opts.job_name.clone(),
            log_base,
            release_label: None,
        })
    }

    async fn submit(&self, opts: &RunOptions, plan: &RunPlan) -> Result<String> {
        let request = self.build_request(opts, plan)?;
        self.client.submit(&request).await
    }

    async fn status(&self, run_id: &str) -> Result<RunStatus<StepState>> {
        self.client.status(&self.cluster_id, run_id).await
    }

    fn log_location(&self, run_id: &str, plan: &RunPlan) -> Result<String> {
        let base = plan
            .log_base
            .as_deref()
            .ok_or_else(|| Error::Configuration("no log location for this run".to_string()))?;
        Ok(join_uri(
            base,
            &[&self.cluster_id, "steps", run_id, "stdout.gz"],
        ))
    }

    async fn wait_for_logs(&self, uri: &str, opts: &RunOptions) -> Result<()> {
        let wait = LogWait::from_timeout_minutes(self.log_wait_delay, opts.timeout_minutes);
        logs::wait_for_object(self.store.as_ref(), uri, wait).await
    }
}
