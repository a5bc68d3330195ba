//! # Middleware Stack
//!
//! - [`metrics`]: request and error counters plus latency histograms.
//!
//! Request tracing is `tower_http::trace::TraceLayer`, installed in
//! [`crate::app`].

pub mod metrics;
