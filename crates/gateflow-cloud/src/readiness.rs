//! Readiness polling with exponential backoff
//!
//! Asynchronous resources (gateways) are only usable once the provider
//! reports them ready. We poll `describe` with a growing interval until the
//! readiness predicate holds or the overall bound elapses.

use crate::provider::{CloudProvider, ResourceDescriptor};
use crate::resource::ResourceSpec;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};
use tokio_util::sync::CancellationToken;

/// Floor for any delay between polls
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Polling schedule for asynchronous resources
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay before the second poll
    pub initial_interval: Duration,

    /// Upper bound for a single delay
    pub max_interval: Duration,

    /// Exponential multiplier
    pub multiplier: f64,

    /// Give up after this much time
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(30),
            multiplier: 1.5,
            timeout: Duration::from_secs(600),
        }
    }
}

impl PollConfig {
    /// Fixed interval, no backoff
    pub fn fixed(interval: Duration, timeout: Duration) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            multiplier: 1.0,
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delay after the given attempt (0-based), capped at `max_interval`
    /// and never below [`MIN_POLL_INTERVAL`]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let millis = self.initial_interval.as_millis() as f64 * factor;
        let capped = millis.min(self.max_interval.as_millis() as f64);
        Duration::from_millis(capped as u64).max(MIN_POLL_INTERVAL)
    }
}

/// How a readiness wait ended
#[derive(Debug)]
pub enum Readiness {
    Ready(ResourceDescriptor),
    TimedOut { waited: Duration },
    Cancelled,
}

/// Poll `describe(spec)` until ready, timed out, or cancelled.
///
/// `describe` errors are treated as "not ready yet"; only the overall bound
/// ends the wait unsuccessfully. The bound also covers a `describe` call
/// that is still running when it elapses.
pub async fn wait_until_ready(
    provider: &dyn CloudProvider,
    spec: &ResourceSpec,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Readiness {
    let started = Instant::now();
    let deadline = started + config.timeout;
    let mut attempt = 0u32;

    loop {
        let described = tokio::select! {
            _ = cancel.cancelled() => return Readiness::Cancelled,
            described = timeout_at(deadline, provider.describe(spec)) => described,
        };

        let Ok(described) = described else {
            tracing::warn!(
                resource = %spec.id,
                attempt,
                "describe still running at the deadline"
            );
            return Readiness::TimedOut {
                waited: Instant::now() - started,
            };
        };

        match described {
            Ok(descriptor) if descriptor.is_ready() => {
                tracing::debug!(
                    resource = %spec.id,
                    attempt,
                    "Resource reported ready"
                );
                return Readiness::Ready(descriptor);
            }
            Ok(descriptor) => {
                tracing::debug!(
                    resource = %spec.id,
                    attempt,
                    state = descriptor.state.as_deref().unwrap_or("unknown"),
                    "Resource not ready yet"
                );
            }
            Err(e) => {
                tracing::warn!(resource = %spec.id, attempt, "describe failed: {}", e);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Readiness::TimedOut {
                waited: now - started,
            };
        }

        // Never sleep past the deadline; one last poll happens at the bound
        let delay = config.delay_for_attempt(attempt).min(deadline - now);
        tokio::select! {
            _ = cancel.cancelled() => return Readiness::Cancelled,
            _ = sleep(delay) => {}
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryProvider;
    use crate::resource::ResourceKind;

    #[test]
    fn test_delay_calculation() {
        let config = PollConfig {
            initial_interval: Duration::from_millis(1000),
            max_interval: Duration::from_millis(10000),
            multiplier: 2.0,
            timeout: Duration::from_secs(60),
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(8000));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(10000)); // capped
        assert_eq!(config.delay_for_attempt(500), Duration::from_millis(10000));
    }

    #[test]
    fn test_fixed_interval() {
        let config = PollConfig::fixed(Duration::from_secs(3), Duration::from_secs(30));
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(3));
        assert_eq!(config.delay_for_attempt(7), Duration::from_secs(3));
    }

    #[test]
    fn test_zero_interval_is_floored() {
        let config = PollConfig::fixed(Duration::ZERO, Duration::from_secs(30));
        assert_eq!(config.delay_for_attempt(0), MIN_POLL_INTERVAL);
        assert_eq!(config.delay_for_attempt(9), MIN_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_describe_is_bounded() {
        let provider = MemoryProvider::new()
            .with_existing("gateway")
            .slow_describe("gateway", Duration::from_secs(3600));
        let spec = ResourceSpec::new("gateway", ResourceKind::Gateway);
        let config = PollConfig::fixed(Duration::from_secs(1), Duration::from_secs(10));

        let started = Instant::now();
        let cancel = CancellationToken::new();
        let outcome = wait_until_ready(&provider, &spec, &config, &cancel).await;

        match outcome {
            Readiness::TimedOut { waited } => assert_eq!(waited, Duration::from_secs(10)),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_hung_describe() {
        let provider = MemoryProvider::new()
            .with_existing("gateway")
            .slow_describe("gateway", Duration::from_secs(3600));
        let spec = ResourceSpec::new("gateway", ResourceKind::Gateway);
        let config = PollConfig::fixed(Duration::from_secs(1), Duration::from_secs(600));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(2)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let outcome = wait_until_ready(&provider, &spec, &config, &cancel).await;

        assert!(matches!(outcome, Readiness::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
