use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_emrserverless::Client;
use aws_sdk_emrserverless::types::{
    ConfigurationOverrides, JobDriver, MonitoringConfiguration, S3MonitoringConfiguration,
    SparkSubmit,
};
use emr_core::executor::{JobClient, RunStatus, ServerlessJobRequest, ServerlessState};
use emr_core::{Error, Result};
use tracing::debug;

use super::describe;

/// EMR Serverless job client.
pub struct ServerlessJobClient {
    client: Client,
}

impl ServerlessJobClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self::with_client(Client::new(config))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobClient for ServerlessJobClient {
    type Request = ServerlessJobRequest;
    type State = ServerlessState;

    async fn submit(&self, request: &ServerlessJobRequest) -> Result<String> {
        let spark = SparkSubmit::builder()
            .entry_point(&request.entry_point)
            .set_entry_point_arguments(Some(request.entry_point_arguments.clone()))
            .set_spark_submit_parameters(request.spark_submit_parameters.clone())
            .build()
            .map_err(|e| Error::Submission(e.to_string()))?;

        let overrides = request.log_uri.as_ref().map(|uri| {
            ConfigurationOverrides::builder()
                .monitoring_configuration(
                    MonitoringConfiguration::builder()
                        .s3_monitoring_configuration(
                            S3MonitoringConfiguration::builder().log_uri(uri).build(),
                        )
                        .build(),
                )
                .build()
        });

        debug!(application_id = %request.application_id, name = %request.name, "Starting job run");
        let response = self
            .client
            .start_job_run()
            .application_id(&request.application_id)
            .execution_role_arn(&request.execution_role_arn)
            .name(&request.name)
            .job_driver(JobDriver::SparkSubmit(spark))
            .execution_timeout_minutes(request.execution_timeout_minutes)
            .set_configuration_overrides(overrides)
            .send()
            .await
            .map_err(|e| Error::Submission(describe(e)))?;

        Ok(response.job_run_id().to_string())
    }

    async fn status(&self, application_id: &str, run_id: &str) -> Result<RunStatus<ServerlessState>> {
        let response = self
            .client
            .get_job_run()
            .application_id(application_id)
            .job_run_id(run_id)
            .send()
            .await
            .map_err(|e| Error::Remote(describe(e)))?;

        let job_run = response
            .job_run()
            .ok_or_else(|| Error::Remote(format!("no job run returned for {}", run_id)))?;
        let state: ServerlessState = job_run.state().as_str().parse()?;
        let detail = job_run.state_details();

        let status = RunStatus::new(state);
        Ok(if detail.is_empty() {
            status
        } else {
            status.with_detail(detail)
        })
    }
}
