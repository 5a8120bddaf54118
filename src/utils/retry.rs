use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

// ============================================================================
// Startup Retry - Waiting For The Database
// ============================================================================
//
// Only connection-level failures are retried (database still starting,
// pool exhausted). Append conflicts never go through here: the caller has
// to reload the stream instead.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Patient settings for waiting on a database that is still starting.
    pub fn startup() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            ..Self::default()
        }
    }

    /// Pauses between consecutive attempts, one fewer than `max_attempts`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        std::iter::successors(Some(self.initial_delay.min(self.max_delay)), |delay| {
            Some(delay.mul_f64(self.multiplier).min(self.max_delay))
        })
        .take(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// Errors a later attempt may not hit again.
pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

impl IsTransient for sqlx::Error {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Tls(_)
        )
    }
}

/// Runs `operation` until it succeeds, fails permanently, or runs out of
/// attempts. The attempt number, starting at 1, is passed in.
pub async fn retry_on_transient<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsTransient,
{
    let mut delays = config.delays();
    let mut attempt = 1;

    loop {
        let error = match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Connected after retry");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        let transient = error.is_transient();
        let Some(delay) = delays.next().filter(|_| transient) else {
            tracing::error!(attempt, transient, error = %error, "Giving up");
            return Err(error);
        };

        tracing::warn!(
            attempt,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "Transient failure, retrying"
        );
        sleep(delay).await;
        attempt += 1;
    }
}
