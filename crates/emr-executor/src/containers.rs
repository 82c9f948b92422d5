//! EMR on EKS backend.

use async_trait::async_trait;
use emr_core::executor::{
    ContainerClient, ContainerJobRequest, ContainerState, DEFAULT_JOB_NAME, JobClient, RunOptions,
    RunStatus,
};
use emr_core::package::DeploymentPackage;
use emr_core::storage::{ObjectStore, join_uri};
use emr_core::{BackendKind, Error, Result};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::info;

use crate::poll::DEFAULT_POLL_INTERVAL;
use crate::runner::{self, JobRunner, RunPlan};

static JOB_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[.\-_/#A-Za-z0-9]+$").unwrap());

/// Runs jobs on an EMR on EKS virtual cluster.
pub struct ContainerRunner {
    virtual_cluster_id: String,
    job_role: String,
    release_label: Option<String>,
    package: Arc<dyn DeploymentPackage>,
    client: Arc<dyn ContainerClient>,
    store: Arc<dyn ObjectStore>,
    poll_interval: Duration,
}

impl ContainerRunner {
    pub fn new(
        virtual_cluster_id: impl Into<String>,
        job_role: impl Into<String>,
        package: Arc<dyn DeploymentPackage>,
        client: Arc<dyn ContainerClient>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            virtual_cluster_id: virtual_cluster_id.into(),
            job_role: job_role.into(),
            release_label: None,
            package,
            client,
            store,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Pin the release label instead of using the latest Spark release.
    pub fn with_release_label(mut self, label: impl Into<String>) -> Self {
        self.release_label = Some(label.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn build_request(&self, opts: &RunOptions, plan: &RunPlan) -> Result<ContainerJobRequest> {
        let release_label = plan
            .release_label
            .clone()
            .ok_or_else(|| Error::Configuration("a release label is required".to_string()))?;
        let rendered = self.package.parameters().render_for(BackendKind::Containers);
        let params = opts.submit_parameters(&rendered);

        Ok(ContainerJobRequest {
            virtual_cluster_id: self.virtual_cluster_id.clone(),
            name: plan.job_name.clone(),
            execution_role_arn: self.job_role.clone(),
            release_label,
            entry_point: self.package.entrypoint_uri()?,
            entry_point_arguments: opts.job_args.clone(),
            spark_submit_parameters: (!params.is_empty()).then_some(params),
            log_uri: opts.logs_uri.clone(),
        })
    }

    async fn resolve_release_label(&self) -> Result<String> {
        if let Some(label) = &self.release_label {
            return Ok(label.clone());
        }
        let latest = self.client.latest_release_label(None).await?.ok_or_else(|| {
            Error::Configuration("unable to find the latest Spark release label".to_string())
        })?;
        let label = format!("{}-latest", latest);
        info!(release_label = %label, "Using latest release label");
        Ok(label)
    }

    pub async fn run_job(&self, opts: &RunOptions) -> Result<String> {
        runner::run_job(self, opts).await
    }
}

/// Validate a job name, translating the CLI default into an accepted form.
pub fn container_job_name(name: &str) -> Result<String> {
    let name = if name == DEFAULT_JOB_NAME {
        slugify(name)
    } else {
        name.to_string()
    };
    if !JOB_NAME_REGEX.is_match(&name) {
        return Err(Error::Configuration(format!(
            "invalid job name '{}': only letters, digits and . - _ / # are allowed",
            name
        )));
    }
    Ok(name)
}

fn slugify(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || ".-_/#".contains(c) {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[async_trait]
impl JobRunner for ContainerRunner {
    type State = ContainerState;

    fn backend(&self) -> BackendKind {
        BackendKind::Containers
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    fn validate(&self, opts: &RunOptions) -> Result<()> {
        opts.validate()?;
        if self.virtual_cluster_id.is_empty() {
            return Err(Error::Configuration(
                "a virtual cluster id is required".to_string(),
            ));
        }
        if opts.show_logs && opts.logs_uri.is_none() {
            return Err(Error::Configuration(
                "--show-stdout requires --s3-logs-uri to be set".to_string(),
            ));
        }
        container_job_name(&opts.job_name).map(|_| ())
    }

    async fn preflight(&self, opts: &RunOptions) -> Result<RunPlan> {
        self.validate(opts)?;
        let job_name = container_job_name(&opts.job_name)?;
        let release_label = self.resolve_release_label().await?;

        Ok(RunPlan {
            job_name,
            log_base: opts.logs_uri.clone(),
            release_label: Some(release_label),
        })
    }

    async fn submit(&self, opts: &RunOptions, plan: &RunPlan) -> Result<String> {
        let request = self.build_request(opts, plan)?;
        self.client.submit(&request).await
    }

    async fn status(&self, run_id: &str) -> Result<RunStatus<ContainerState>> {
        self.client.status(&self.virtual_cluster_id, run_id).await
    }

    fn log_location(&self, run_id: &str, plan: &RunPlan) -> Result<String> {
        let base = plan
            .log_base
            .as_deref()
            .ok_or_else(|| Error::Configuration("no log location for this run".to_string()))?;
        let container = format!("spark-{}", run_id);
        let driver = format!("spark-{}-driver", run_id);
        Ok(join_uri(
            base,
            &[
                &self.virtual_cluster_id,
                "jobs",
                run_id,
                "containers",
                &container,
                &driver,
                "stdout.gz",
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::execute;
    use crate::testing::{MockJobClient, MockStore, StubPackage};

    const VC_ID: &str = "vc-abc123";
    const RUN_ID: &str = "000000033example";

    type EksClient = MockJobClient<ContainerJobRequest, ContainerState>;

    fn runner_with(client: &Arc<EksClient>, store: &Arc<MockStore>) -> ContainerRunner {
        ContainerRunner::new(
            VC_ID,
            "arn:aws:iam::123456789012:role/eks-job",
            Arc::new(StubPackage::new("s3://bucket/code/main.py")),
            client.clone(),
            store.clone(),
        )
        .with_poll_interval(Duration::ZERO)
    }

    #[test]
    fn test_default_job_name_is_translated() {
        assert_eq!(container_job_name(DEFAULT_JOB_NAME).unwrap(), "emr-cli-job");
        assert_eq!(container_job_name("nightly_etl.v2").unwrap(), "nightly_etl.v2");
    }

    #[test]
    fn test_invalid_job_name() {
        assert!(matches!(
            container_job_name("my job"),
            Err(Error::Configuration(_))
        ));
        assert!(container_job_name("").is_err());
        assert!(container_job_name("etl:daily").is_err());
    }

    #[tokio::test]
    async fn test_invalid_job_name_rejected_before_submit() {
        let client = Arc::new(EksClient::new(RUN_ID));
        let store = Arc::new(MockStore::default());
        let runner = runner_with(&client, &store).with_release_label("emr-7.2.0-latest");

        let opts = RunOptions {
            job_name: "daily report".to_string(),
            ..Default::default()
        };
        let err = execute(&runner, &opts, &mut std::io::sink()).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(client.total_calls(), 0);
    }

    #[test]
    fn test_validate_is_local() {
        let client = Arc::new(EksClient::new(RUN_ID).with_release_label("emr-7.2.0"));
        let store = Arc::new(MockStore::default());
        let runner = runner_with(&client, &store);

        assert!(runner.validate(&RunOptions::default()).is_ok());
        let opts = RunOptions {
            job_name: "daily report".to_string(),
            ..Default::default()
        };
        assert!(matches!(runner.validate(&opts), Err(Error::Configuration(_))));
        assert_eq!(client.total_calls(), 0);
        assert_eq!(store.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_release_label_falls_back_to_latest() {
        let client = Arc::new(EksClient::new(RUN_ID).with_release_label("emr-7.2.0"));
        let store = Arc::new(MockStore::default());
        let runner = runner_with(&client, &store);

        let report = execute(&runner, &RunOptions::default(), &mut std::io::sink())
            .await
            .unwrap();
        assert_eq!(report.run_id, RUN_ID);

        let submitted = client.submitted();
        assert_eq!(client.lookup_count(), 1);
        assert_eq!(submitted[0].release_label, "emr-7.2.0-latest");
        assert_eq!(submitted[0].name, "emr-cli-job");
        assert_eq!(submitted[0].virtual_cluster_id, VC_ID);
    }

    #[tokio::test]
    async fn test_pinned_release_label_skips_lookup() {
        let client = Arc::new(EksClient::new(RUN_ID).with_release_label("emr-7.2.0"));
        let store = Arc::new(MockStore::default());
        let runner = runner_with(&client, &store).with_release_label("emr-6.15.0-latest");

        execute(&runner, &RunOptions::default(), &mut std::io::sink())
            .await
            .unwrap();
        assert_eq!(client.lookup_count(), 0);
        assert_eq!(client.submitted()[0].release_label, "emr-6.15.0-latest");
    }

    #[tokio::test]
    async fn test_no_release_label_available() {
        let client = Arc::new(EksClient::new(RUN_ID));
        let store = Arc::new(MockStore::default());
        let runner = runner_with(&client, &store);

        let err = execute(&runner, &RunOptions::default(), &mut std::io::sink())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(client.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_show_logs_without_uri_makes_no_remote_calls() {
        let client = Arc::new(EksClient::new(RUN_ID).with_release_label("emr-7.2.0"));
        let store = Arc::new(MockStore::default());
        let runner = runner_with(&client, &store);

        let opts = RunOptions {
            show_logs: true,
            ..Default::default()
        };
        let err = execute(&runner, &opts, &mut std::io::sink()).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(client.total_calls(), 0);
        assert_eq!(store.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_completed_job_prints_driver_stdout() {
        let log_uri = format!(
            "s3://bucket/logs/{}/jobs/{}/containers/spark-{}/spark-{}-driver/stdout.gz",
            VC_ID, RUN_ID, RUN_ID, RUN_ID
        );
        let client = Arc::new(
            EksClient::new(RUN_ID)
                .with_release_label("emr-7.2.0")
                .with_statuses(vec![
                    RunStatus::new(ContainerState::Pending),
                    RunStatus::new(ContainerState::Running),
                    RunStatus::new(ContainerState::Completed),
                ]),
        );
        let store = Arc::new(MockStore::default().with_object(&log_uri, "rows written: 42\n"));
        let runner = runner_with(&client, &store);

        let opts = RunOptions {
            show_logs: true,
            logs_uri: Some("s3://bucket/logs/".to_string()),
            ..Default::default()
        };
        let mut out: Vec<u8> = Vec::new();
        let report = execute(&runner, &opts, &mut out).await.unwrap();

        let outcome = report.outcome.unwrap();
        assert_eq!(outcome.queries, 3);
        assert_eq!(outcome.transitions.len(), 3);
        assert_eq!(client.status_addresses(), vec![VC_ID; 3]);
        assert_eq!(client.submitted()[0].log_uri.as_deref(), Some("s3://bucket/logs/"));
        assert!(String::from_utf8(out).unwrap().contains("rows written: 42"));
    }

    #[tokio::test]
    async fn test_cancelled_job_fails() {
        let client = Arc::new(
            EksClient::new(RUN_ID)
                .with_release_label("emr-7.2.0")
                .with_statuses(vec![RunStatus::new(ContainerState::Cancelled)]),
        );
        let store = Arc::new(MockStore::default());
        let runner = runner_with(&client, &store);

        let opts = RunOptions {
            wait: true,
            ..Default::default()
        };
        let err = execute(&runner, &opts, &mut std::io::sink()).await.unwrap_err();
        assert!(matches!(err, Error::JobFailed { ref state, .. } if state == "CANCELLED"));
        assert_eq!(err.exit_code(), 1);
    }
}
