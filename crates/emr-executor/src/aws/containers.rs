use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_emrcontainers::Client;
use aws_sdk_emrcontainers::types::{
    ConfigurationOverrides, JobDriver, MonitoringConfiguration, S3MonitoringConfiguration,
    SparkSubmitJobDriver,
};
use emr_core::executor::{
    ContainerClient, ContainerJobRequest, ContainerState, JobClient, RunStatus,
};
use emr_core::{Error, Result};
use tracing::debug;

use super::describe;
use super::emr::EmrClient;

/// EMR on EKS job client. Release labels come from the EMR API.
pub struct ContainersClient {
    client: Client,
    releases: EmrClient,
}

impl ContainersClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self::with_client(Client::new(config), EmrClient::new(config))
    }

    pub fn with_client(client: Client, releases: EmrClient) -> Self {
        Self { client, releases }
    }
}

#[async_trait]
impl JobClient for ContainersClient {
    type Request = ContainerJobRequest;
    type State = ContainerState;

    async fn submit(&self, request: &ContainerJobRequest) -> Result<String> {
        let spark = SparkSubmitJobDriver::builder()
            .entry_point(&request.entry_point)
            .set_entry_point_arguments(Some(request.entry_point_arguments.clone()))
            .set_spark_submit_parameters(request.spark_submit_parameters.clone())
            .build()
            .map_err(|e| Error::Submission(e.to_string()))?;

        let overrides = match &request.log_uri {
            Some(uri) => {
                let s3 = S3MonitoringConfiguration::builder()
                    .log_uri(uri)
                    .build()
                    .map_err(|e| Error::Submission(e.to_string()))?;
                Some(
                    ConfigurationOverrides::builder()
                        .monitoring_configuration(
                            MonitoringConfiguration::builder()
                                .s3_monitoring_configuration(s3)
                                .build(),
                        )
                        .build(),
                )
            }
            None => None,
        };

        debug!(
            virtual_cluster_id = %request.virtual_cluster_id,
            release_label = %request.release_label,
            "Starting job run"
        );
        let response = self
            .client
            .start_job_run()
            .virtual_cluster_id(&request.virtual_cluster_id)
            .name(&request.name)
            .execution_role_arn(&request.execution_role_arn)
            .release_label(&request.release_label)
            .job_driver(JobDriver::builder().spark_submit_job_driver(spark).build())
            .set_configuration_overrides(overrides)
            .send()
            .await
            .map_err(|e| Error::Submission(describe(e)))?;

        response
            .id()
            .map(str::to_string)
            .ok_or_else(|| Error::Submission("no job run id returned".to_string()))
    }

    async fn status(&self, virtual_cluster_id: &str, run_id: &str) -> Result<RunStatus<ContainerState>> {
        let response = self
            .client
            .describe_job_run()
            .virtual_cluster_id(virtual_cluster_id)
            .id(run_id)
            .send()
            .await
            .map_err(|e| Error::Remote(describe(e)))?;

        let job_run = response
            .job_run()
            .ok_or_else(|| Error::Remote(format!("no job run returned for {}", run_id)))?;
        let state: ContainerState = job_run
            .state()
            .map(|s| s.as_str())
            .ok_or_else(|| Error::Remote(format!("no state returned for job run {}", run_id)))?
            .parse()?;

        Ok(match job_run.state_details() {
            Some(detail) if !detail.is_empty() => RunStatus::new(state).with_detail(detail),
            _ => RunStatus::new(state),
        })
    }
}

#[async_trait]
impl ContainerClient for ContainersClient {
    async fn latest_release_label(&self, prefix: Option<&str>) -> Result<Option<String>> {
        self.releases.latest_release_label(prefix).await
    }
}
