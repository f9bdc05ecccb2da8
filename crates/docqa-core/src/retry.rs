//! Bounded retry with exponential backoff for query-time provider calls.

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::config::RetrySettings;

/// Upper bound for a single wait between attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// A single attempt, no waiting.
    pub const NONE: Self = Self { max_attempts: 1, initial_backoff: Duration::ZERO };

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self { max_attempts: settings.max_attempts.max(1), initial_backoff: Duration::from_millis(settings.initial_backoff_ms) }
    }

    /// Run `op` until it succeeds, returns an error `retryable` rejects, or attempts run out.
    pub fn run<T, E, F, R>(&self, what: &str, mut op: F, retryable: R) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
        R: Fn(&E) -> bool,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.max_attempts && retryable(&e) => {
                    warn!(attempt, max_attempts = self.max_attempts, delay_ms = backoff.as_millis() as u64, error = %e, "{what} failed, retrying");
                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self { Self::from_settings(&RetrySettings::default()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy { max_attempts, initial_backoff: Duration::from_millis(1) }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let out: Result<u32, String> = quick(3).run("op", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 { Err("flaky".to_string()) } else { Ok(7) }
        }, |_| true);
        assert_eq!(out, Ok(7));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let out: Result<(), String> = quick(2).run("op", || { calls.set(calls.get() + 1); Err("down".to_string()) }, |_| true);
        assert!(out.is_err());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let out: Result<(), String> = quick(5).run("op", || { calls.set(calls.get() + 1); Err("bad input".to_string()) }, |_| false);
        assert!(out.is_err());
        assert_eq!(calls.get(), 1);
    }
}
