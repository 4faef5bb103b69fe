//! # Vowkit Common
//!
//! Shared utilities for the vowkit caching engine.
//!
//! ## Features
//!
//! - Tracing setup for embedding hosts
//! - Bounded retry with capped doubling backoff

pub mod logging;
pub mod retry;

pub use logging::{init_tracing, LogOptions};
pub use retry::RetryPolicy;
