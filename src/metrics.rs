//! Prometheus metrics for outbound calls and request handling.
//!
//! This module provides metrics for:
//! - Frontend-to-backend call latency and outcome
//! - Database probe latency and outcome
//! - Secret store lookups at startup
//! - Items created through the backend API

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing::{debug, info};

// === Metric Name Constants ===

/// Remote call latency metric name.
pub const METRIC_REMOTE_CALL_LATENCY: &str = "remote_call_latency_ms";
/// Remote calls counter metric name.
pub const METRIC_REMOTE_CALLS: &str = "remote_calls_total";
/// Database probe latency metric name.
pub const METRIC_DB_PROBE_LATENCY: &str = "db_probe_latency_ms";
/// Database probes counter metric name.
pub const METRIC_DB_PROBES: &str = "db_probes_total";
/// Secret lookups counter metric name.
pub const METRIC_SECRET_LOOKUPS: &str = "secret_lookups_total";
/// Secret lookup latency metric name.
pub const METRIC_SECRET_LOOKUP_LATENCY: &str = "secret_lookup_latency_ms";
/// Items created counter metric name.
pub const METRIC_ITEMS_CREATED: &str = "items_created_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_REMOTE_CALL_LATENCY,
        "Latency of calls to the backend service in milliseconds"
    );
    describe_histogram!(
        METRIC_DB_PROBE_LATENCY,
        "Database liveness probe latency in milliseconds"
    );
    describe_histogram!(
        METRIC_SECRET_LOOKUP_LATENCY,
        "Secret store lookup latency in milliseconds"
    );

    describe_counter!(
        METRIC_REMOTE_CALLS,
        "Total number of calls to the backend service"
    );
    describe_counter!(METRIC_DB_PROBES, "Total number of database probes");
    describe_counter!(METRIC_SECRET_LOOKUPS, "Total number of secret lookups");
    describe_counter!(METRIC_ITEMS_CREATED, "Total number of items created");

    debug!("Metrics initialized");
}

/// Install the Prometheus recorder with a scrape listener on `port`.
pub fn install_exporter(port: u16) -> Result<(), BuildError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!("Prometheus exporter listening on {}", addr);
    Ok(())
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failure"
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Record a call to the backend.
pub fn record_remote_call(start: Instant, target: &str, ok: bool) {
    histogram!(METRIC_REMOTE_CALL_LATENCY, "target" => target.to_string()).record(elapsed_ms(start));
    counter!(METRIC_REMOTE_CALLS, "target" => target.to_string(), "outcome" => outcome(ok))
        .increment(1);
}

/// Record a database probe.
pub fn record_db_probe(start: Instant, ok: bool) {
    histogram!(METRIC_DB_PROBE_LATENCY).record(elapsed_ms(start));
    counter!(METRIC_DB_PROBES, "outcome" => outcome(ok)).increment(1);
}

/// Record a secret store lookup.
pub fn record_secret_lookup(start: Instant, ok: bool) {
    histogram!(METRIC_SECRET_LOOKUP_LATENCY).record(elapsed_ms(start));
    counter!(METRIC_SECRET_LOOKUPS, "outcome" => outcome(ok)).increment(1);
}

/// Increment items created counter.
pub fn inc_items_created() {
    counter!(METRIC_ITEMS_CREATED).increment(1);
}
