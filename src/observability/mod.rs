//! Logs and metrics for the gateway.
//!
//! `logging` installs the tracing subscriber (pretty or JSON, filtered by
//! `RUST_LOG` or the configured level). `metrics` owns the Prometheus
//! exporter and the counter names; when the exporter is disabled the
//! recorders are no-ops.

pub mod logging;
pub mod metrics;
