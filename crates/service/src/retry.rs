use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Polling policy for a resource that may report itself busy.
///
/// Waits grow exponentially from `backoff_base` and are capped at
/// `backoff_max`. The loop ends after `max_attempts` checks or once the
/// optional overall `timeout` would be exceeded by the next wait.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
    timeout: Option<Duration>,
    enabled: bool,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        backoff_base: Duration,
        backoff_max: Duration,
        enabled: bool,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            backoff_max: backoff_max.max(backoff_base),
            timeout: None,
            enabled,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn from_config(cfg: &configs::RetryConfig) -> Self {
        let timeout = (cfg.timeout_secs > 0).then(|| Duration::from_secs(cfg.timeout_secs));
        Self::new(
            cfg.max_attempts,
            Duration::from_millis(cfg.backoff_base_ms),
            Duration::from_millis(cfg.backoff_max_ms),
            cfg.enabled,
        )
        .with_timeout(timeout)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_attempts
        } else {
            1
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Wait after the `attempt`-th busy check (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor).min(self.backoff_max)
    }

    pub async fn wait_before_retry(&self, attempt: u32) {
        if !self.enabled || attempt == 0 {
            return;
        }
        let backoff_duration = self.backoff(attempt);
        debug!("Retrying in {:?} (attempt {})", backoff_duration, attempt);
        sleep(backoff_duration).await;
    }

    /// Whether another check may follow the `attempt`-th one.
    pub fn should_retry(&self, attempt: u32, elapsed: Duration) -> bool {
        if !self.enabled {
            return false;
        }
        if attempt >= self.max_attempts {
            debug!("Max retry attempts ({}) reached", self.max_attempts);
            return false;
        }
        if let Some(timeout) = self.timeout {
            if elapsed.saturating_add(self.backoff(attempt)) > timeout {
                debug!("Retry timeout ({:?}) would be exceeded", timeout);
                return false;
            }
        }
        true
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&configs::RetryConfig::default())
    }
}

/// Result of one check.
#[derive(Debug)]
pub enum Attempt<T> {
    Ready(T),
    Busy,
}

#[derive(Debug)]
pub enum RetryError<E> {
    /// The check itself failed; never retried.
    Failed(E),
    /// Still busy after this many checks.
    Exhausted { attempts: u32 },
}

/// Run `check` until it reports `Ready`, sleeping per `policy` while it is `Busy`.
pub async fn retry_while_busy<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut check: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt<T>, E>>,
{
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match check().await.map_err(RetryError::Failed)? {
            Attempt::Ready(value) => {
                if attempt > 1 {
                    debug!("Resource became free after {} checks", attempt);
                }
                return Ok(value);
            }
            Attempt::Busy => {
                if !policy.should_retry(attempt, started.elapsed()) {
                    warn!(attempts = attempt, "giving up while resource is still busy");
                    return Err(RetryError::Exhausted { attempts: attempt });
                }
                policy.wait_before_retry(attempt).await;
            }
        }
    }
}
