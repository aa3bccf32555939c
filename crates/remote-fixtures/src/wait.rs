//! Bounded-wait polling.
//!
//! Every blocking operation in the crate is a check repeated under a deadline:
//! the first check runs immediately, the loop sleeps `min(interval, remaining)`
//! between checks, and one last check runs at the deadline. Nothing here
//! spawns threads; the caller's thread is the one that sleeps.

use std::time::{Duration, Instant};
use tracing::trace;

use crate::result::{FixtureError, FixtureResult, TransportError};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default resolution deadline (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Upper bound for the interval when backoff is enabled (250ms)
pub const DEFAULT_MAX_POLL_INTERVAL_MS: u64 = 250;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Initial polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Interval cap in milliseconds
    pub max_poll_interval_ms: u64,
    /// Interval growth factor per attempt; 1.0 keeps the interval fixed
    pub backoff: f64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_poll_interval_ms: DEFAULT_MAX_POLL_INTERVAL_MS,
            backoff: 1.0,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set timeout from a duration
    #[must_use]
    pub fn with_timeout_duration(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Grow the interval by `factor` after each empty check, capped at `max_ms`
    #[must_use]
    pub fn with_backoff(mut self, factor: f64, max_ms: u64) -> Self {
        self.backoff = factor;
        self.max_poll_interval_ms = max_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Interval to use after `current`.
    ///
    /// Never exceeds the cap, however large the backoff factor.
    #[must_use]
    pub fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff <= 1.0 {
            return current;
        }
        let cap = Duration::from_millis(self.max_poll_interval_ms.max(self.poll_interval_ms));
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff)
            .map_or(cap, |next| next.min(cap))
    }

    /// Reject options that would busy-loop or stop making progress
    pub fn validate(&self) -> FixtureResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(FixtureError::config("poll_interval_ms must be positive"));
        }
        if self.max_poll_interval_ms < self.poll_interval_ms {
            return Err(FixtureError::config(format!(
                "max_poll_interval_ms ({}) is below poll_interval_ms ({})",
                self.max_poll_interval_ms, self.poll_interval_ms
            )));
        }
        if !self.backoff.is_finite() || self.backoff < 1.0 {
            return Err(FixtureError::config(format!(
                "backoff must be a finite factor of at least 1.0, got {}",
                self.backoff
            )));
        }
        Ok(())
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Successful outcome of a wait
#[derive(Debug, Clone)]
pub struct WaitResult<T> {
    /// Value produced by the check
    pub value: T,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of checks issued
    pub attempts: usize,
}

/// Why a poll ended without a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitFailure {
    /// Deadline reached
    TimedOut {
        /// Time spent waiting
        elapsed: Duration,
        /// Number of checks issued
        attempts: usize,
        /// Transient failure reported by the final check
        last_error: Option<TransportError>,
    },
    /// A check reported a non-transient failure
    Aborted(TransportError),
}

// =============================================================================
// WAITER IMPLEMENTATION
// =============================================================================

/// Waiter for synchronization operations
#[derive(Debug, Clone, Default)]
pub struct Waiter {
    options: WaitOptions,
}

impl Waiter {
    /// Create a new waiter with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom options
    #[must_use]
    pub const fn with_options(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Options in use
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Repeat `check` until it yields a value or the deadline passes.
    ///
    /// Transient transport errors are swallowed and retried; the one reported
    /// by the final check, if any, is kept for the timeout diagnostic.
    /// Non-transient errors end the wait at once.
    pub fn poll<T, P>(&self, mut check: P) -> Result<WaitResult<T>, WaitFailure>
    where
        P: FnMut() -> Result<Option<T>, TransportError>,
    {
        let start = Instant::now();
        let timeout = self.options.timeout();
        let mut interval = self.options.poll_interval();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let last_error = match check() {
                Ok(Some(value)) => {
                    return Ok(WaitResult {
                        value,
                        elapsed: start.elapsed(),
                        attempts,
                    });
                }
                Ok(None) => None,
                Err(error) if error.is_transient() => {
                    trace!(attempt = attempts, %error, "transient failure while polling");
                    Some(error)
                }
                Err(error) => return Err(WaitFailure::Aborted(error)),
            };

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(WaitFailure::TimedOut {
                    elapsed,
                    attempts,
                    last_error,
                });
            }
            std::thread::sleep(interval.min(timeout - elapsed));
            interval = self.options.next_interval(interval);
        }
    }

    /// Wait for function/predicate to return true
    pub fn wait_for_function<F>(
        &self,
        predicate: F,
        description: impl Into<String>,
    ) -> FixtureResult<WaitResult<()>>
    where
        F: Fn() -> bool,
    {
        self.poll(|| Ok(predicate().then_some(())))
            .map_err(|_| FixtureError::WaitTimeout {
                description: description.into(),
                timeout: self.options.timeout(),
            })
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Wait for a condition with default polling
pub fn wait_until<F>(predicate: F, timeout_ms: u64) -> FixtureResult<()>
where
    F: Fn() -> bool,
{
    let waiter = Waiter::with_options(WaitOptions::new().with_timeout(timeout_ms));
    waiter.wait_for_function(predicate, "custom condition")?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::cell::Cell;

    // =========================================================================
    // WaitOptions Tests
    // =========================================================================

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_wait_options_default() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
            assert_eq!(opts.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
            assert_eq!(opts.max_poll_interval_ms, DEFAULT_MAX_POLL_INTERVAL_MS);
            assert_eq!(opts.backoff, 1.0);
        }

        #[test]
        fn test_wait_options_chained() {
            let opts = WaitOptions::new()
                .with_timeout(10_000)
                .with_poll_interval(20)
                .with_backoff(1.5, 200);
            assert_eq!(opts.timeout(), Duration::from_secs(10));
            assert_eq!(opts.poll_interval(), Duration::from_millis(20));
            assert_eq!(opts.backoff, 1.5);
            assert_eq!(opts.max_poll_interval_ms, 200);
        }

        #[test]
        fn test_timeout_from_duration() {
            let opts = WaitOptions::new().with_timeout_duration(Duration::from_millis(750));
            assert_eq!(opts.timeout_ms, 750);
        }

        #[test]
        fn test_fixed_interval_without_backoff() {
            let opts = WaitOptions::new().with_poll_interval(50);
            let next = opts.next_interval(Duration::from_millis(50));
            assert_eq!(next, Duration::from_millis(50));
        }

        #[test]
        fn test_backoff_grows_and_caps() {
            let opts = WaitOptions::new()
                .with_poll_interval(40)
                .with_backoff(2.0, 100);
            let second = opts.next_interval(Duration::from_millis(40));
            assert_eq!(second, Duration::from_millis(80));
            let third = opts.next_interval(second);
            assert_eq!(third, Duration::from_millis(100));
            assert_eq!(opts.next_interval(third), Duration::from_millis(100));
        }

        #[test]
        fn test_huge_backoff_is_capped() {
            let cap = Duration::from_millis(250);
            for factor in [1.0e300, f64::INFINITY, f64::MAX] {
                let opts = WaitOptions::new().with_poll_interval(50).with_backoff(factor, 250);
                assert_eq!(opts.next_interval(Duration::from_millis(50)), cap);
                assert_eq!(opts.next_interval(cap), cap);
            }
        }

        #[test]
        fn test_validate_accepts_defaults_and_backoff() {
            assert!(WaitOptions::default().validate().is_ok());
            assert!(WaitOptions::new().with_backoff(1.5, 400).validate().is_ok());
        }

        #[test]
        fn test_validate_rejects_busy_loop_and_bad_backoff() {
            let zero = WaitOptions::new().with_poll_interval(0);
            assert!(matches!(zero.validate(), Err(FixtureError::Config { .. })));

            let inverted = WaitOptions::new().with_poll_interval(100).with_backoff(1.0, 50);
            assert!(inverted.validate().is_err());

            for factor in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN, 0.5] {
                let opts = WaitOptions::new().with_backoff(factor, 250);
                assert!(opts.validate().is_err(), "accepted backoff {factor}");
            }
        }
    }

    // =========================================================================
    // Poll Tests
    // =========================================================================

    mod poll_tests {
        use super::*;

        #[test]
        fn test_first_check_is_immediate() {
            let waiter = Waiter::with_options(WaitOptions::new().with_poll_interval(500));
            let start = Instant::now();
            let result = waiter.poll(|| Ok(Some(7))).unwrap();
            assert_eq!(result.value, 7);
            assert_eq!(result.attempts, 1);
            assert!(start.elapsed() < Duration::from_millis(100));
        }

        #[test]
        fn test_value_appearing_mid_wait() {
            let waiter = Waiter::with_options(
                WaitOptions::new().with_timeout(500).with_poll_interval(50),
            );
            let start = Instant::now();
            let result = waiter
                .poll(|| Ok((start.elapsed() >= Duration::from_millis(120)).then_some("ready")))
                .unwrap();
            let elapsed = start.elapsed();
            assert_eq!(result.value, "ready");
            assert!(elapsed >= Duration::from_millis(120));
            assert!(elapsed < Duration::from_millis(200), "took {elapsed:?}");
        }

        #[test]
        fn test_timeout_bounds() {
            let waiter = Waiter::with_options(
                WaitOptions::new().with_timeout(200).with_poll_interval(50),
            );
            let start = Instant::now();
            let failure = waiter.poll::<(), _>(|| Ok(None)).unwrap_err();
            let elapsed = start.elapsed();
            assert!(elapsed >= Duration::from_millis(200));
            assert!(elapsed < Duration::from_millis(280), "took {elapsed:?}");
            match failure {
                WaitFailure::TimedOut {
                    attempts,
                    last_error,
                    ..
                } => {
                    assert!(attempts >= 4);
                    assert!(last_error.is_none());
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_zero_timeout_checks_once() {
            let waiter = Waiter::with_options(WaitOptions::new().with_timeout(0));
            let calls = Cell::new(0);
            let failure = waiter
                .poll::<(), _>(|| {
                    calls.set(calls.get() + 1);
                    Ok(None)
                })
                .unwrap_err();
            assert_eq!(calls.get(), 1);
            assert!(matches!(failure, WaitFailure::TimedOut { attempts: 1, .. }));
        }

        #[test]
        fn test_transient_errors_are_retried() {
            let waiter = Waiter::with_options(
                WaitOptions::new().with_timeout(1_000).with_poll_interval(5),
            );
            let calls = Cell::new(0);
            let result = waiter
                .poll(|| {
                    calls.set(calls.get() + 1);
                    if calls.get() < 3 {
                        Err(TransportError::unreachable("restarting"))
                    } else {
                        Ok(Some(calls.get()))
                    }
                })
                .unwrap();
            assert_eq!(result.value, 3);
            assert_eq!(result.attempts, 3);
        }

        #[test]
        fn test_persistent_transient_error_is_kept() {
            let waiter = Waiter::with_options(
                WaitOptions::new().with_timeout(60).with_poll_interval(10),
            );
            let failure = waiter
                .poll::<(), _>(|| Err(TransportError::TimedOut { ms: 5 }))
                .unwrap_err();
            match failure {
                WaitFailure::TimedOut { last_error, .. } => {
                    assert_eq!(last_error, Some(TransportError::TimedOut { ms: 5 }));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_recovered_transient_error_is_forgotten() {
            let waiter = Waiter::with_options(
                WaitOptions::new().with_timeout(60).with_poll_interval(10),
            );
            let calls = Cell::new(0);
            let failure = waiter
                .poll::<(), _>(|| {
                    calls.set(calls.get() + 1);
                    if calls.get() == 1 {
                        Err(TransportError::unreachable("blip"))
                    } else {
                        Ok(None)
                    }
                })
                .unwrap_err();
            assert!(matches!(
                failure,
                WaitFailure::TimedOut {
                    last_error: None,
                    ..
                }
            ));
        }

        #[test]
        fn test_non_transient_error_aborts() {
            let waiter = Waiter::with_options(WaitOptions::new().with_timeout(5_000));
            let start = Instant::now();
            let failure = waiter
                .poll::<(), _>(|| Err(TransportError::rejected("bad query")))
                .unwrap_err();
            assert!(start.elapsed() < Duration::from_millis(100));
            assert_eq!(
                failure,
                WaitFailure::Aborted(TransportError::rejected("bad query"))
            );
        }
    }

    // =========================================================================
    // Predicate Tests
    // =========================================================================

    mod predicate_tests {
        use super::*;
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        #[test]
        fn test_wait_for_function_becomes_true() {
            let flag = Arc::new(AtomicBool::new(false));
            let setter = Arc::clone(&flag);

            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                setter.store(true, Ordering::SeqCst);
            });

            let waiter = Waiter::with_options(
                WaitOptions::new().with_timeout(2_000).with_poll_interval(10),
            );
            let result = waiter
                .wait_for_function(|| flag.load(Ordering::SeqCst), "flag set")
                .unwrap();
            assert!(result.attempts >= 2);
        }

        #[test]
        fn test_wait_for_function_times_out() {
            let waiter = Waiter::with_options(
                WaitOptions::new().with_timeout(30).with_poll_interval(10),
            );
            let err = waiter.wait_for_function(|| false, "never").unwrap_err();
            match err {
                FixtureError::WaitTimeout {
                    description,
                    timeout,
                } => {
                    assert_eq!(description, "never");
                    assert_eq!(timeout, Duration::from_millis(30));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_wait_until_helper() {
            assert!(wait_until(|| true, 10).is_ok());
            assert!(wait_until(|| false, 10).is_err());
        }
    }
}
