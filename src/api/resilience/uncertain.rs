//! Uncertain-outcome retry
//!
//! A write that times out at the gateway may still have completed on the
//! hub. Repeating it risks a duplicate; giving up risks silently losing it.
//! Instead the caller supplies a check that can prove after the fact whether
//! the write landed, and we poll that check for a bounded time.

use crate::action_log::ActionLog;
use crate::api::error::RemoteError;
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TimeoutRetry {
    /// Fixed wait before each completion check
    pub delay: Duration,
    pub max_retries: u32,
    /// When set, non-timeout responses are returned immediately. When
    /// cleared, any error that carries a response status is checked.
    pub throw_on_non_timeout: bool,
}

impl Default for TimeoutRetry {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            max_retries: 30,
            throw_on_non_timeout: true,
        }
    }
}

impl TimeoutRetry {
    pub fn new(delay: Duration, max_retries: u32) -> Self {
        Self {
            delay,
            max_retries,
            ..Self::default()
        }
    }

    pub fn throw_on_non_timeout(mut self, value: bool) -> Self {
        self.throw_on_non_timeout = value;
        self
    }

    /// Run `request`. If it fails with a timeout, poll `finished_check` until
    /// it reports the work as done (`Ok(Some(value))`) or the retry budget is
    /// spent, in which case the original error is returned unchanged.
    ///
    /// `finished_check` is never called when `request` succeeds.
    pub async fn attempt<T, R, RFut, C, CFut>(
        &self,
        log: &ActionLog,
        request: R,
        mut finished_check: C,
    ) -> Result<T, RemoteError>
    where
        R: FnOnce() -> RFut,
        RFut: Future<Output = Result<T, RemoteError>>,
        C: FnMut() -> CFut,
        CFut: Future<Output = Result<Option<T>, RemoteError>>,
    {
        let error = match request().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let Some(status) = error.status() else {
            return Err(error);
        };
        if !error.is_timeout() && self.throw_on_non_timeout {
            return Err(error);
        }

        log.add_comment(format!(
            "Request failed with status {}; checking whether it completed anyway",
            status
        ));

        for attempt in 1..=self.max_retries {
            tokio::time::sleep(self.delay).await;

            match finished_check().await {
                Ok(Some(value)) => {
                    debug!("Completion confirmed on check {}", attempt);
                    log.add_comment(format!("Request confirmed complete after {} checks", attempt));
                    return Ok(value);
                }
                Ok(None) => {
                    debug!("Check {}/{}: not finished yet", attempt, self.max_retries);
                }
                Err(check_error) => {
                    warn!("Completion check {} failed: {}", attempt, check_error);
                    log.add_comment(format!("Completion check failed: {}", check_error));
                }
            }
        }

        log.add_comment(format!(
            "Could not confirm completion after {} checks",
            self.max_retries
        ));
        Err(error)
    }
}
