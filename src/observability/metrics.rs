//! Metrics collection and exposition.
//!
//! # Metrics
//! - `luna_page_requests_total` (counter): page responses by cache outcome, status
//! - `luna_page_duration_seconds` (histogram): page latency by cache outcome
//! - `luna_builds_total` (counter): bundle builds by target, outcome
//! - `luna_build_duration_seconds` (histogram): bundle build latency by target
//! - `luna_renders_total` (counter): server renders by outcome
//! - `luna_render_duration_seconds` (histogram): server render latency
//! - `luna_reload_messages_total` (counter): reload frames delivered
//! - `luna_reload_pruned_total` (counter): connections dropped on failed writes
//! - `luna_reload_clients` (gauge): live reload connections
//! - `luna_cache_entries` (gauge): stored pages
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the exporter
//! - Labels are low-cardinality: never the request path

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
/// Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe();
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

fn describe() {
    describe_counter!("luna_page_requests_total", "Page responses by cache outcome and status");
    describe_histogram!("luna_page_duration_seconds", "Page latency by cache outcome");
    describe_counter!("luna_builds_total", "Bundle builds by target and outcome");
    describe_histogram!("luna_build_duration_seconds", "Bundle build latency by target");
    describe_counter!("luna_renders_total", "Server renders by outcome");
    describe_histogram!("luna_render_duration_seconds", "Server render latency");
    describe_counter!("luna_reload_messages_total", "Reload frames delivered");
    describe_counter!("luna_reload_pruned_total", "Reload connections dropped after a failed write");
    describe_gauge!("luna_reload_clients", "Live reload connections");
    describe_gauge!("luna_cache_entries", "Stored pages");
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}

/// `cache` is one of `hit`, `miss`, `bypass` (zero TTL) or `static`.
pub fn record_page(cache: &'static str, status: u16, start: Instant) {
    counter!("luna_page_requests_total", "cache" => cache, "status" => status.to_string()).increment(1);
    histogram!("luna_page_duration_seconds", "cache" => cache).record(start.elapsed().as_secs_f64());
}

pub fn record_build(target: &'static str, ok: bool, start: Instant) {
    counter!("luna_builds_total", "target" => target, "outcome" => outcome(ok)).increment(1);
    histogram!("luna_build_duration_seconds", "target" => target).record(start.elapsed().as_secs_f64());
}

pub fn record_render(ok: bool, start: Instant) {
    counter!("luna_renders_total", "outcome" => outcome(ok)).increment(1);
    histogram!("luna_render_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_reload(delivered: usize, pruned: usize) {
    counter!("luna_reload_messages_total").increment(delivered as u64);
    counter!("luna_reload_pruned_total").increment(pruned as u64);
}

pub fn record_reload_clients(count: usize) {
    gauge!("luna_reload_clients").set(count as f64);
}

pub fn record_cache_size(entries: usize) {
    gauge!("luna_cache_entries").set(entries as f64);
}
