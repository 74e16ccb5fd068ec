#![deny(unused)]
//! Observability for prefixgate.
//!
//! This crate provides:
//! - Tracing subscriber setup (stdout, JSON, OTLP)
//! - Prometheus metrics for prefix resolution and HTTP traffic

pub mod metrics;
pub mod tracing_layer;

pub use crate::metrics::{setup_metrics_recorder, track_request, track_resolution, track_trailing_slash_redirect};
pub use crate::tracing_layer::configure_tracing;
