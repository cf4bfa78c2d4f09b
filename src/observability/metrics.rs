//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): requests by method, status, route
//! - `router_request_duration_seconds` (histogram): latency by method, route
//! - `router_aborts_total` (counter): aborted requests by route
//! - `router_routes_registered` (gauge): size of the route table
//!
//! The `route` label is the route's pattern (never the raw path) or `none`
//! for unmatched requests, keeping label cardinality bounded.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

const BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Install the Prometheus recorder with a scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(BUCKETS)?
        .install()?;
    describe_metrics();
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

fn describe_metrics() {
    describe_counter!("router_requests_total", "Total number of dispatched requests");
    describe_histogram!(
        "router_request_duration_seconds",
        "Request dispatch duration in seconds"
    );
    describe_counter!("router_aborts_total", "Requests ended by a middleware abort");
    describe_gauge!("router_routes_registered", "Number of registered routes");
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "router_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    histogram!(
        "router_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_abort(route: &str) {
    counter!("router_aborts_total", "route" => route.to_string()).increment(1);
}

pub fn set_routes_registered(count: usize) {
    gauge!("router_routes_registered").set(count as f64);
}
