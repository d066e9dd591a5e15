//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_controller_lifecycle_stage` (gauge): current lifecycle stage ordinal
//! - `gateway_controller_admission_reviews_total` (counter): reviews by outcome
//! - `gateway_controller_reconciles_total` (counter): ingress reconciles by result
//!
//! Without an installed recorder every call is a no-op, so tests and
//! `check-config` never need an exporter.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::Stage;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_stage(stage: Stage) {
    metrics::gauge!("gateway_controller_lifecycle_stage").set(stage.ordinal() as f64);
}

pub fn record_admission(outcome: &'static str) {
    metrics::counter!("gateway_controller_admission_reviews_total", "outcome" => outcome).increment(1);
}

pub fn record_reconcile(result: &'static str) {
    metrics::counter!("gateway_controller_reconciles_total", "result" => result).increment(1);
}
