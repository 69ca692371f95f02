//! Cache metrics for observability

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Page cache lookups segmented by backend and outcome (hit/miss/expired/error).
    pub static ref PAGE_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "page_cache_events_total",
        "Page cache lookups segmented by backend and outcome",
        &["backend", "event"]
    )
    .expect("failed to register page_cache_events_total");

    /// Page cache writes segmented by backend and result (success/error).
    pub static ref PAGE_CACHE_WRITES: IntCounterVec = register_int_counter_vec!(
        "page_cache_writes_total",
        "Page cache writes segmented by backend and result",
        &["backend", "result"]
    )
    .expect("failed to register page_cache_writes_total");
}

pub(crate) fn record_event(backend: &str, event: &str) {
    PAGE_CACHE_EVENTS.with_label_values(&[backend, event]).inc();
}

pub(crate) fn record_write(backend: &str, result: &str) {
    PAGE_CACHE_WRITES.with_label_values(&[backend, result]).inc();
}
