//! HTTP server for the relay.
//!
//! - [`api`]: AppState, router, route handlers, error-to-status mapping
//! - [`metrics`]: Prometheus counters and latency histogram

pub mod api;
pub mod metrics;
