use crate::{Error, Result};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed wait between attempts
    pub interval: Duration,
    /// `None` retries forever
    pub max_attempts: Option<u32>,
    /// Failed attempts after this many are only logged at debug level
    pub quiet_after: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_attempts: None,
            quiet_after: 10,
        }
    }
}

impl RetryPolicy {
    fn exhausted(&self, attempt: u32) -> bool {
        matches!(self.max_attempts, Some(max) if attempt >= max)
    }
}

/// Keeps calling `open` until it hands back a pool, waiting a fixed
/// interval between failed attempts. `on_first_success` runs once, with the
/// pool, before it is returned.
///
/// Fails only when the policy runs out of attempts or `cancel` fires.
pub async fn connect<T, E, F, Fut, S>(
    label: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut open: F,
    on_first_success: Option<S>,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
    S: FnOnce(&T),
{
    let mut attempt: u32 = 1;
    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = open() => result,
        };
        match result {
            Ok(pool) => {
                info!("Connected to {label} database after {attempt} attempt(s)");
                if let Some(after) = on_first_success {
                    after(&pool);
                }
                return Ok(pool);
            }
            Err(e) => {
                if attempt <= policy.quiet_after {
                    error!(
                        "Could not connect to {label} database! Retrying ({attempt}/{}) in {}ms... [{e}]",
                        policy.quiet_after,
                        policy.interval.as_millis()
                    );
                } else {
                    debug!("{label} connection attempt {attempt} failed [{e}]");
                }
                if policy.exhausted(attempt) {
                    return Err(Error::ConnectGaveUp {
                        label: label.into(),
                        attempts: attempt,
                    });
                }
            }
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep(policy.interval) => {}
        }
        attempt += 1;
    }
}
