//! Bounded retry for flaky pattern-RAM transfers.
//!
//! Back-to-back pattern line reads and writes occasionally fail on real
//! hardware. [`RetryPolicy`] re-runs such an operation a fixed number of
//! times with a fixed cooldown between attempts.

use std::fmt::Display;
use std::time::Duration;

use crate::protocol::{OPS_INTERVAL, OPS_TRY_TIMES};

/// How many times to try, and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves like one.
    pub attempts: u32,
    /// Sleep between a failed attempt and the next one.
    pub cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: OPS_TRY_TIMES,
            cooldown: OPS_INTERVAL,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, cooldown: Duration) -> Self {
        Self { attempts, cooldown }
    }

    /// Run `op` until it succeeds or attempts run out; returns the last error.
    pub fn run<T, E: Display>(&self, op: impl FnMut() -> Result<T, E>) -> Result<T, E> {
        self.run_with_sleep(op, std::thread::sleep)
    }

    /// [`run`](Self::run) with an injectable sleep.
    pub fn run_with_sleep<T, E: Display>(
        &self,
        mut op: impl FnMut() -> Result<T, E>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T, E> {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if attempt < attempts => {
                    log::warn!("attempt {attempt}/{attempts} failed, retrying: {e}");
                    sleep(self.cooldown);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_values() {
        let p = RetryPolicy::default();
        assert_eq!(p.attempts, 3);
        assert_eq!(p.cooldown, Duration::from_millis(30));
    }

    #[test]
    fn succeeds_on_third_attempt_after_two_sleeps() {
        let mut calls = 0;
        let mut sleeps = Vec::new();
        let result = RetryPolicy::default().run_with_sleep(
            || {
                calls += 1;
                if calls < 3 { Err("transient") } else { Ok(calls) }
            },
            |d| sleeps.push(d),
        );
        assert_eq!(result, Ok(3));
        assert_eq!(calls, 3);
        assert_eq!(sleeps, vec![Duration::from_millis(30); 2]);
    }

    #[test]
    fn returns_last_error_when_exhausted() {
        let mut calls = 0;
        let mut sleeps = 0;
        let result: Result<(), String> = RetryPolicy::default().run_with_sleep(
            || {
                calls += 1;
                Err(format!("failure {calls}"))
            },
            |_| sleeps += 1,
        );
        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls, 3);
        assert_eq!(sleeps, 2);
    }

    #[test]
    fn first_success_never_sleeps() {
        let mut sleeps = 0;
        let result: Result<u8, &str> =
            RetryPolicy::default().run_with_sleep(|| Ok(7), |_| sleeps += 1);
        assert_eq!(result, Ok(7));
        assert_eq!(sleeps, 0);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let mut calls = 0;
        let result: Result<(), &str> = RetryPolicy::new(0, Duration::ZERO).run(|| {
            calls += 1;
            Err("nope")
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn run_sleeps_for_real() {
        let started = std::time::Instant::now();
        let _: Result<(), &str> = RetryPolicy::new(2, Duration::from_millis(20)).run(|| Err("nope"));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
