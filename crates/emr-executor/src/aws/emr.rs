use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_emr::Client;
use aws_sdk_emr::types::{ActionOnFailure, HadoopJarStepConfig, ReleaseLabelFilter, StepConfig};
use emr_core::executor::{ClusterClient, ClusterStepRequest, JobClient, RunStatus, StepState};
use emr_core::{Error, Result};
use tracing::debug;

use super::describe;

/// EMR on EC2 client. Also answers release label queries for EMR on EKS.
#[derive(Clone)]
pub struct EmrClient {
    client: Client,
}

impl EmrClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self::with_client(Client::new(config))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Newest Spark release label, optionally restricted to a prefix like `emr-7`.
    pub async fn latest_release_label(&self, prefix: Option<&str>) -> Result<Option<String>> {
        let filter = ReleaseLabelFilter::builder()
            .application("Spark")
            .set_prefix(prefix.map(str::to_string))
            .build();

        let mut labels = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let response = self
                .client
                .list_release_labels()
                .filters(filter.clone())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| Error::Remote(describe(e)))?;
            labels.extend(response.release_labels().iter().cloned());
            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(count = labels.len(), "Listed release labels");
        Ok(newest_label(&labels))
    }
}

/// Pick the highest `emr-X.Y.Z` label by numeric version.
fn newest_label(labels: &[String]) -> Option<String> {
    labels
        .iter()
        .max_by_key(|label| version_key(label))
        .cloned()
}

fn step_config(request: &ClusterStepRequest) -> StepConfig {
    let jar_step = HadoopJarStepConfig::builder()
        .jar(&request.jar)
        .set_args(Some(request.args.clone()))
        .build();
    StepConfig::builder()
        .name(&request.name)
        .action_on_failure(ActionOnFailure::from(request.action_on_failure.as_str()))
        .hadoop_jar_step(jar_step)
        .build()
}

fn version_key(label: &str) -> Vec<u64> {
    label
        .trim_start_matches("emr-")
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

#[async_trait]
impl JobClient for EmrClient {
    type Request = ClusterStepRequest;
    type State = StepState;

    async fn submit(&self, request: &ClusterStepRequest) -> Result<String> {
        let step = step_config(request);

        debug!(cluster_id = %request.cluster_id, name = %request.name, "Adding job flow step");
        let response = self
            .client
            .add_job_flow_steps()
            .job_flow_id(&request.cluster_id)
            .steps(step)
            .send()
            .await
            .map_err(|e| Error::Submission(describe(e)))?;

        response
            .step_ids()
            .first()
            .cloned()
            .ok_or_else(|| Error::Submission("no step id returned".to_string()))
    }

    async fn status(&self, cluster_id: &str, run_id: &str) -> Result<RunStatus<StepState>> {
        let response = self
            .client
            .describe_step()
            .cluster_id(cluster_id)
            .step_id(run_id)
            .send()
            .await
            .map_err(|e| Error::Remote(describe(e)))?;

        let status = response
            .step()
            .and_then(|step| step.status())
            .ok_or_else(|| Error::Remote(format!("no status returned for step {}", run_id)))?;
        let state: StepState = status
            .state()
            .map(|s| s.as_str())
            .ok_or_else(|| Error::Remote(format!("no state returned for step {}", run_id)))?
            .parse()?;

        let detail = status
            .failure_details()
            .and_then(|d| d.message().or(d.reason()));
        Ok(match detail {
            Some(detail) => RunStatus::new(state).with_detail(detail),
            None => RunStatus::new(state),
        })
    }
}

#[async_trait]
impl ClusterClient for EmrClient {
    async fn log_uri(&self, cluster_id: &str) -> Result<Option<String>> {
        let response = self
            .client
            .describe_cluster()
            .cluster_id(cluster_id)
            .send()
            .await
            .map_err(|e| Error::Remote(describe(e)))?;

        Ok(response
            .cluster()
            .and_then(|cluster| cluster.log_uri())
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_label() {
        let labels: Vec<String> = ["emr-6.15.0", "emr-7.10.0", "emr-7.2.0", "emr-5.36.2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(newest_label(&labels).as_deref(), Some("emr-7.10.0"));
        assert_eq!(newest_label(&[]), None);
    }

    #[test]
    fn test_step_config() {
        let request = ClusterStepRequest {
            cluster_id: "j-123".to_string(),
            name: "nightly".to_string(),
            action_on_failure: "CONTINUE".to_string(),
            jar: "command-runner.jar".to_string(),
            args: vec!["spark-submit".to_string(), "s3://bucket/code/main.py".to_string()],
        };

        let step = step_config(&request);
        assert_eq!(step.name(), Some("nightly"));
        assert_eq!(step.action_on_failure(), Some(&ActionOnFailure::Continue));
        let jar_step = step.hadoop_jar_step().unwrap();
        assert_eq!(jar_step.jar(), Some("command-runner.jar"));
        assert_eq!(jar_step.args(), request.args.as_slice());
    }
}
