//! Generic retry engine with exponential backoff and jitter.
//!
//! Drives any fallible async operation. The delay grows exponentially per
//! attempt with uniform jitter added on top, and the loop stops on whichever
//! comes first of the attempt cap, the wall-clock budget, or a hook veto.
//! The last failure is returned as-is; callers never see a synthetic
//! "gave up" error.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Backoff and budget parameters for one retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocation cap, first try included. Treated as at least 1.
    pub max_attempts: u32,

    /// Delay before the first retry; doubles each attempt after that.
    pub base_delay: Duration,

    /// Upper bound on the exponential part of the delay.
    pub max_delay: Duration,

    /// Wall-clock budget across all attempts and sleeps.
    pub max_total_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_total_elapsed: Duration::MAX,
        }
    }
}

/// Per-call adjustments layered over a base [`RetryPolicy`].
///
/// Unset fields keep the base value, so call sites only spell out what
/// actually differs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryOverrides {
    pub max_attempts: Option<u32>,
    pub base_delay: Option<Duration>,
    pub max_delay: Option<Duration>,
    pub max_total_elapsed: Option<Duration>,
}

impl RetryPolicy {
    /// Apply per-call overrides, field by field.
    pub fn with_overrides(&self, overrides: &RetryOverrides) -> RetryPolicy {
        RetryPolicy {
            max_attempts: overrides.max_attempts.unwrap_or(self.max_attempts),
            base_delay: overrides.base_delay.unwrap_or(self.base_delay),
            max_delay: overrides.max_delay.unwrap_or(self.max_delay),
            max_total_elapsed: overrides
                .max_total_elapsed
                .unwrap_or(self.max_total_elapsed),
        }
    }

    /// Exponential delay for a zero-based attempt index, before jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.min(31));
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let cap_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(factor).min(cap_ms))
    }
}

/// Hook points around each failed attempt.
///
/// Hook bodies own their internal failures; nothing a hook does can abort
/// the retry loop.
#[async_trait]
pub trait RetryHooks<E: Send + Sync>: Send {
    /// Observes every failure, including the final one.
    fn on_failure(&mut self, _err: &E, _attempt: u32) {}

    /// Veto further attempts for failures that cannot clear on their own.
    fn should_retry(&mut self, _err: &E, _attempt: u32) -> bool {
        true
    }

    /// Runs after a retry is decided, before the backoff sleep.
    async fn before_retry(&mut self, _err: &E, _attempt: u32) {}
}

/// Hook set that accepts every default.
pub struct NoHooks;

#[async_trait]
impl<E: Send + Sync> RetryHooks<E> for NoHooks {}

/// Drive `op` under `policy`, consulting `hooks` between attempts.
///
/// `label` names the operation in log lines. Returns the first success or
/// the last failure once the policy is exhausted.
pub async fn run_with_retries<T, E, Op, Fut, H>(
    label: &str,
    policy: &RetryPolicy,
    hooks: &mut H,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + Send + Sync,
    H: RetryHooks<E>,
{
    let attempts = policy.max_attempts.max(1);
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(
                        "{} succeeded on attempt {}/{}",
                        label,
                        attempt + 1,
                        attempts
                    );
                }
                return Ok(value);
            }
            Err(err) => {
                hooks.on_failure(&err, attempt);

                let eligible = hooks.should_retry(&err, attempt);
                let out_of_attempts = attempt + 1 >= attempts;
                let out_of_time = started.elapsed() >= policy.max_total_elapsed;

                if !eligible {
                    debug!("{} failed, not retryable: {}", label, err);
                    return Err(err);
                }
                if out_of_attempts || out_of_time {
                    warn!(
                        "{} gave up after attempt {}/{} ({}ms elapsed): {}",
                        label,
                        attempt + 1,
                        attempts,
                        started.elapsed().as_millis(),
                        err
                    );
                    return Err(err);
                }

                let delay = policy.delay_for_attempt(attempt) + jitter_for(policy, attempt);
                warn!(
                    "{} attempt {}/{} failed: {}; retrying in {}ms",
                    label,
                    attempt + 1,
                    attempts,
                    err,
                    delay.as_millis()
                );

                hooks.before_retry(&err, attempt).await;
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Uniform jitter in `[0, expo/2)` on top of the exponential delay.
fn jitter_for(policy: &RetryPolicy, attempt: u32) -> Duration {
    let half_ms = u64::try_from(policy.delay_for_attempt(attempt).as_millis())
        .unwrap_or(u64::MAX)
        / 2;
    if half_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..half_ms))
}
