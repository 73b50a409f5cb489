//! Resilience configuration with builder pattern

use super::retry::RetryConfig;
use super::uncertain::TimeoutRetry;
use std::time::Duration;

/// How hub calls recover from failures
#[derive(Debug, Clone, Default)]
pub struct ResilienceConfig {
    /// Backoff for idempotent reads
    pub retry: RetryConfig,
    /// Completion polling for writes that timed out
    pub timeout: TimeoutRetry,
}

impl ResilienceConfig {
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }

    /// No read retries and no waiting between completion checks (for testing)
    pub fn disabled() -> Self {
        Self {
            retry: RetryConfig::disabled(),
            timeout: TimeoutRetry::new(Duration::ZERO, 3),
        }
    }
}

#[derive(Debug)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResilienceConfig::default(),
        }
    }

    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    pub fn poll_delay(mut self, delay: Duration) -> Self {
        self.config.timeout.delay = delay;
        self
    }

    pub fn max_completion_checks(mut self, checks: u32) -> Self {
        self.config.timeout.max_retries = checks;
        self
    }

    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}

impl Default for ResilienceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
