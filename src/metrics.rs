// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation.
//!
//! Uses the `metrics` crate for backend-agnostic collection; the parent
//! daemon chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `atlas_search_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `operation`: index, remove
//! - `status`: success, noop, skipped_not_found, skipped_status, error
//! - `kind`: fetch failure classification

use metrics::{counter, histogram};
use std::time::Duration;

/// Record a failed detail fetch by classification.
pub fn record_fetch_error(kind: &str) {
    counter!(
        "atlas_search_fetch_errors_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record an index mutation outcome.
pub fn record_index_operation(operation: &str, status: &str) {
    counter!(
        "atlas_search_index_operations_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a search query execution.
pub fn record_search_query(status: &str) {
    counter!(
        "atlas_search_queries_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record search query latency.
pub fn record_search_latency(duration: Duration) {
    histogram!("atlas_search_query_seconds").record(duration.as_secs_f64());
}

/// Record how many results a search page returned.
pub fn record_search_results(count: usize) {
    histogram!("atlas_search_results").record(count as f64);
}
