//! Failure handling for hub calls
//!
//! Provides backoff retries for reads and completion polling for writes
//! whose outcome is unknown after a gateway timeout.

pub mod config;
pub mod retry;
pub mod uncertain;

pub use config::{ResilienceConfig, ResilienceConfigBuilder};
pub use retry::{RetryConfig, RetryPolicy, RetryableError};
pub use uncertain::TimeoutRetry;
