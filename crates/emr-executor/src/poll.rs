//! Status polling shared by every backend.

use emr_core::Result;
use emr_core::executor::RunStatus;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

/// Interval between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// What the polling loop observed.
#[derive(Debug, Clone)]
pub struct PollOutcome<S> {
    /// Final, terminal status.
    pub status: RunStatus<S>,
    /// Number of status queries made.
    pub queries: usize,
    /// Every observed state change, in order.
    pub transitions: Vec<(S, S)>,
}

/// Query `status` until `is_terminal` holds, sleeping `interval` between queries.
///
/// There is no local deadline: timeouts are enforced by the remote service.
/// A failed query ends the loop with that error.
pub async fn poll_until<S, F, Fut, T>(
    interval: Duration,
    initial: S,
    mut status: F,
    is_terminal: T,
) -> Result<PollOutcome<S>>
where
    S: Copy + PartialEq + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RunStatus<S>>>,
    T: Fn(&S) -> bool,
{
    let mut last = initial;
    let mut queries = 0;
    let mut transitions = Vec::new();

    loop {
        let current = status().await?;
        queries += 1;

        if current.state != last {
            info!(from = %last, to = %current.state, "Job state is now: {}", current.state);
            transitions.push((last, current.state));
            last = current.state;
        }

        if is_terminal(&current.state) {
            return Ok(PollOutcome {
                status: current,
                queries,
                transitions,
            });
        }

        sleep(interval).await;
    }
}
