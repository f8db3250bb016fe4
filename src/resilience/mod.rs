//! Infrastructure resilience: bounded retry for storage calls.

pub mod retry;

pub use retry::{retry, RetryConfig};
