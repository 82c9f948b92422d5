//! Job log retrieval from object storage.

use emr_core::storage::ObjectStore;
use emr_core::{Error, Result};
use flate2::read::MultiGzDecoder;
use std::io::{Read, Write};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// Delay between log existence checks.
pub const LOG_WAIT_DELAY: Duration = Duration::from_secs(30);

/// Default time to wait for a log object to appear.
pub const DEFAULT_LOG_WAIT_BUDGET: Duration = Duration::from_secs(300);

/// Bounded wait for a log object that is written after the job finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogWait {
    pub delay: Duration,
    pub budget: Duration,
}

impl Default for LogWait {
    fn default() -> Self {
        Self {
            delay: LOG_WAIT_DELAY,
            budget: DEFAULT_LOG_WAIT_BUDGET,
        }
    }
}

impl LogWait {
    /// Budget taken from a timeout in minutes, falling back to the default.
    pub fn from_timeout_minutes(delay: Duration, timeout_minutes: Option<i64>) -> Self {
        let budget = match timeout_minutes {
            Some(minutes) if minutes > 0 => {
                Duration::from_secs((minutes as u64).saturating_mul(60))
            }
            _ => DEFAULT_LOG_WAIT_BUDGET,
        };
        Self { delay, budget }
    }

    /// Number of existence checks, always at least one.
    pub fn max_attempts(&self) -> u32 {
        if self.delay.is_zero() {
            return 1;
        }
        let delay = self.delay.as_nanos();
        let attempts = self.budget.as_nanos().div_ceil(delay);
        u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
    }
}

/// Decompress gzip data, including concatenated gzip members.
pub fn decode_gzip(data: &[u8]) -> Result<String> {
    let mut decoded = Vec::new();
    MultiGzDecoder::new(data).read_to_end(&mut decoded)?;
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

/// Download and decompress a gzip log object.
pub async fn fetch_log(store: &dyn ObjectStore, uri: &str) -> Result<String> {
    let data = store.get_object(uri).await?;
    debug!(uri, compressed_size = data.len(), "Downloaded log object");
    decode_gzip(&data)
}

/// Download, decompress and write a gzip log object to `out`.
pub async fn fetch_and_print<W: Write>(store: &dyn ObjectStore, uri: &str, out: &mut W) -> Result<()> {
    let text = fetch_log(store, uri).await?;
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Poll until `uri` exists, giving up after the wait budget.
pub async fn wait_for_object(store: &dyn ObjectStore, uri: &str, wait: LogWait) -> Result<()> {
    let attempts = wait.max_attempts();
    info!(uri, max_attempts = attempts, "Waiting for logs to be written");

    for attempt in 1..=attempts {
        if store.object_exists(uri).await? {
            debug!(uri, attempt, "Log object is available");
            return Ok(());
        }
        if attempt < attempts {
            sleep(wait.delay).await;
        }
    }

    Err(Error::LogTimeout {
        uri: uri.to_string(),
        waited: wait.delay * attempts.saturating_sub(1),
    })
}
