//! Retry and backoff policy.
//!
//! Classifies attempt failures (timeouts, throttling, connection failures)
//! and computes exponential backoff so the scheduler and direct downloads
//! share one policy. The retry *budget* lives on each task; this module only
//! decides whether a failure kind is worth retrying and how long to wait.

mod classify;
mod policy;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
