//! The job runner capability and the run driver shared by every backend.
//!
//! A backend adapter only knows how to validate, submit, query and locate
//! logs. [`execute`] strings those steps together: submit, log the run id,
//! optionally poll to a terminal state, optionally print the driver stdout,
//! and turn a non-success terminal state into [`Error::JobFailed`].

use async_trait::async_trait;
use emr_core::executor::{JobState, RunOptions, RunStatus};
use emr_core::storage::ObjectStore;
use emr_core::{BackendKind, Error, Result};
use std::io::Write;
use std::time::Duration;
use tracing::info;

use crate::logs;
use crate::poll::{PollOutcome, poll_until};

/// Values resolved during preflight and used for the rest of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPlan {
    /// Job name as sent to the backend.
    pub job_name: String,
    /// Base URI of the backend's log tree, when logs are wanted.
    pub log_base: Option<String>,
    /// Engine release label, for backends that need one.
    pub release_label: Option<String>,
}

/// A backend that can submit and monitor a job.
#[async_trait]
pub trait JobRunner: Send + Sync {
    type State: JobState;

    fn backend(&self) -> BackendKind;

    fn poll_interval(&self) -> Duration;

    fn store(&self) -> &dyn ObjectStore;

    /// Checks that need no remote calls. Run before anything is uploaded.
    fn validate(&self, opts: &RunOptions) -> Result<()>;

    /// Validate options and resolve everything needed before submitting.
    async fn preflight(&self, opts: &RunOptions) -> Result<RunPlan>;

    /// Submit the job and return its run id.
    async fn submit(&self, opts: &RunOptions, plan: &RunPlan) -> Result<String>;

    async fn status(&self, run_id: &str) -> Result<RunStatus<Self::State>>;

    /// URI of the driver stdout log for a run.
    fn log_location(&self, run_id: &str, plan: &RunPlan) -> Result<String>;

    /// Wait until the log object can be read. Most backends write it before
    /// reporting a terminal state.
    async fn wait_for_logs(&self, _uri: &str, _opts: &RunOptions) -> Result<()> {
        Ok(())
    }
}

/// Outcome of a run driven by [`execute`].
#[derive(Debug, Clone)]
pub struct RunReport<S> {
    pub run_id: String,
    /// Present when the caller waited for the job.
    pub outcome: Option<PollOutcome<S>>,
}

/// Run a job end to end, writing its stdout log to `out` when requested.
pub async fn execute<R, W>(runner: &R, opts: &RunOptions, out: &mut W) -> Result<RunReport<R::State>>
where
    R: JobRunner + ?Sized,
    W: Write,
{
    let backend = runner.backend();
    let service = backend.service_name();

    let plan = runner.preflight(opts).await?;
    let run_id = runner.submit(opts, &plan).await?;
    info!(backend = %backend, run_id = %run_id, "Job submitted to {} (Job Run ID: {})", service, run_id);

    if !opts.needs_polling() {
        return Ok(RunReport {
            run_id,
            outcome: None,
        });
    }

    info!("Waiting for job to complete...");
    let outcome = poll_until(
        runner.poll_interval(),
        R::State::initial(),
        || runner.status(&run_id),
        |state| state.is_terminal(),
    )
    .await?;

    if opts.show_logs {
        let uri = runner.log_location(&run_id, &plan)?;
        runner.wait_for_logs(&uri, opts).await?;
        info!(run_id = %run_id, uri = %uri, "stdout for {}", run_id);
        writeln!(out, "{}", "-".repeat(38))?;
        logs::fetch_and_print(runner.store(), &uri, out).await?;
    }

    let state = outcome.status.state;
    if !state.is_success() {
        let detail = outcome.status.detail.clone().unwrap_or_default();
        return Err(Error::JobFailed {
            run_id,
            state: state.to_string(),
            detail,
        });
    }

    info!(run_id = %run_id, "Job completed successfully!");
    Ok(RunReport {
        run_id,
        outcome: Some(outcome),
    })
}

/// Run a job end to end and return its run id, printing logs to stdout.
pub async fn run_job<R>(runner: &R, opts: &RunOptions) -> Result<String>
where
    R: JobRunner + ?Sized,
{
    let mut stdout = std::io::stdout();
    execute(runner, opts, &mut stdout).await.map(|report| report.run_id)
}
