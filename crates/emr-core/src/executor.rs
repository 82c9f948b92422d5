//! Job runner traits and job types.
//!
//! Each backend speaks its own state vocabulary; all of them map onto the
//! same [`JobPhase`] lifecycle so the polling loop can be shared.

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::str::FromStr;

use crate::{Error, Result};

/// Default job name used by the CLI.
pub const DEFAULT_JOB_NAME: &str = "emr-cli job";

/// Unified lifecycle shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Submitted,
    Running,
    Succeeded,
    Failed,
    CancelPending,
    Cancelled,
}

/// A backend-specific job state.
pub trait JobState: Copy + Eq + Debug + Display + FromStr<Err = Error> + Send + Sync {
    /// State assumed right after submission, before the first status query.
    fn initial() -> Self;

    fn phase(&self) -> JobPhase;

    /// No further polling is needed once a job reaches this state.
    fn is_terminal(&self) -> bool {
        matches!(
            self.phase(),
            JobPhase::Succeeded | JobPhase::Failed | JobPhase::CancelPending | JobPhase::Cancelled
        )
    }

    fn is_success(&self) -> bool {
        self.phase() == JobPhase::Succeeded
    }
}

macro_rules! job_states {
    (
        $(#[$meta:meta])*
        $name:ident, initial = $initial:ident {
            $($variant:ident => $wire:literal => $phase:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(Error::Remote(format!(
                        "unknown {} state: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl JobState for $name {
            fn initial() -> Self {
                $name::$initial
            }

            fn phase(&self) -> JobPhase {
                match self {
                    $($name::$variant => JobPhase::$phase),+
                }
            }
        }
    };
}

job_states! {
    /// EMR Serverless job run state.
    ServerlessState, initial = Submitted {
        Submitted => "SUBMITTED" => Submitted,
        Pending => "PENDING" => Submitted,
        Scheduled => "SCHEDULED" => Submitted,
        Running => "RUNNING" => Running,
        Success => "SUCCESS" => Succeeded,
        Failed => "FAILED" => Failed,
        Cancelling => "CANCELLING" => CancelPending,
        Cancelled => "CANCELLED" => Cancelled,
    }
}

job_states! {
    /// EMR on EC2 step state.
    StepState, initial = Pending {
        Pending => "PENDING" => Submitted,
        CancelPending => "CANCEL_PENDING" => CancelPending,
        Running => "RUNNING" => Running,
        Completed => "COMPLETED" => Succeeded,
        Cancelled => "CANCELLED" => Cancelled,
        Failed => "FAILED" => Failed,
        Interrupted => "INTERRUPTED" => Failed,
    }
}

job_states! {
    /// EMR on EKS job run state.
    ContainerState, initial = Submitted {
        Pending => "PENDING" => Submitted,
        Submitted => "SUBMITTED" => Submitted,
        Running => "RUNNING" => Running,
        Failed => "FAILED" => Failed,
        Cancelled => "CANCELLED" => Cancelled,
        CancelPending => "CANCEL_PENDING" => CancelPending,
        Completed => "COMPLETED" => Succeeded,
    }
}

/// Observed status of a remote job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatus<S> {
    pub state: S,
    /// Backend-provided detail, usually only set for failures.
    pub detail: Option<String>,
}

impl<S> RunStatus<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Caller-supplied options for a single job run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub job_name: String,
    pub job_args: Vec<String>,
    /// Raw spark-submit options appended after the package parameters.
    pub submit_opts: Option<String>,
    pub wait: bool,
    pub show_logs: bool,
    /// Base URI under which the backend writes its logs.
    pub logs_uri: Option<String>,
    /// Timeout in minutes. Passed to the service, never enforced locally.
    pub timeout_minutes: Option<i64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            job_name: DEFAULT_JOB_NAME.to_string(),
            job_args: Vec::new(),
            submit_opts: None,
            wait: false,
            show_logs: false,
            logs_uri: None,
            timeout_minutes: None,
        }
    }
}

impl RunOptions {
    /// Split a comma-delimited argument string; blank input yields no arguments.
    pub fn parse_job_args(raw: &str) -> Vec<String> {
        if raw.is_empty() {
            return Vec::new();
        }
        raw.split(',').map(|s| s.to_string()).collect()
    }

    /// Whether the caller wants to block until the job finishes.
    pub fn needs_polling(&self) -> bool {
        self.wait || self.show_logs
    }

    /// Local checks shared by every backend.
    pub fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.timeout_minutes {
            if timeout < 0 {
                return Err(Error::Configuration(format!(
                    "timeout must be >= 0, got {}",
                    timeout
                )));
            }
        }
        Ok(())
    }

    /// Spark parameters rendered from a package, followed by any extra submit options.
    pub fn submit_parameters(&self, rendered: &str) -> String {
        match self.submit_opts.as_deref() {
            Some(extra) => format!("{} {}", rendered, extra).trim().to_string(),
            None => rendered.trim().to_string(),
        }
    }
}

/// Request sent to EMR Serverless `StartJobRun`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerlessJobRequest {
    pub application_id: String,
    pub execution_role_arn: String,
    pub name: String,
    pub entry_point: String,
    pub entry_point_arguments: Vec<String>,
    pub spark_submit_parameters: Option<String>,
    pub log_uri: Option<String>,
    pub execution_timeout_minutes: i64,
}

/// Request sent to EMR on EC2 `AddJobFlowSteps`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterStepRequest {
    pub cluster_id: String,
    pub name: String,
    pub action_on_failure: String,
    pub jar: String,
    pub args: Vec<String>,
}

/// Request sent to EMR on EKS `StartJobRun`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerJobRequest {
    pub virtual_cluster_id: String,
    pub name: String,
    pub execution_role_arn: String,
    pub release_label: String,
    pub entry_point: String,
    pub entry_point_arguments: Vec<String>,
    pub spark_submit_parameters: Option<String>,
    pub log_uri: Option<String>,
}

/// A remote job-submission service.
#[async_trait]
pub trait JobClient: Send + Sync {
    type Request: Send + Sync;
    type State: JobState;

    /// Submit a job and return its run id.
    async fn submit(&self, request: &Self::Request) -> Result<String>;

    /// Query a run addressed by application, cluster or virtual cluster id.
    async fn status(&self, address: &str, run_id: &str) -> Result<RunStatus<Self::State>>;
}

/// EMR Serverless client.
pub trait ServerlessClient:
    JobClient<Request = ServerlessJobRequest, State = ServerlessState>
{
}

impl<T> ServerlessClient for T where
    T: JobClient<Request = ServerlessJobRequest, State = ServerlessState>
{
}

/// EMR on EC2 client.
#[async_trait]
pub trait ClusterClient: JobClient<Request = ClusterStepRequest, State = StepState> {
    /// The S3 log location configured on the cluster, if any.
    async fn log_uri(&self, cluster_id: &str) -> Result<Option<String>>;
}

/// EMR on EKS client.
#[async_trait]
pub trait ContainerClient: JobClient<Request = ContainerJobRequest, State = ContainerState> {
    /// Most recent Spark release label, optionally restricted to a prefix like `emr-7`.
    async fn latest_release_label(&self, prefix: Option<&str>) -> Result<Option<String>>;
}
