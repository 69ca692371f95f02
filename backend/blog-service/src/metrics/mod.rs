/// Prometheus metrics for blog-service
use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};

use crate::error::{AppError, Result};

lazy_static! {
    /// HTTP requests (labels: method, route pattern, status)
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_http_requests_total",
        "Total number of HTTP requests",
        &["method", "route", "status"]
    )
    .expect("failed to register blog_http_requests_total");

    /// HTTP request latency (labels: method, route pattern)
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "blog_http_request_duration_seconds",
        "HTTP request latency in seconds",
        &["method", "route"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("failed to register blog_http_request_duration_seconds");

    /// Home listing cache lookups (labels: result=hit|miss|error)
    pub static ref INDEX_CACHE_LOOKUPS: IntCounterVec = register_int_counter_vec!(
        "blog_index_cache_lookups_total",
        "Home listing cache lookups",
        &["result"]
    )
    .expect("failed to register blog_index_cache_lookups_total");

    pub static ref POSTS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "blog_posts_created_total",
        "Posts created"
    )
    .expect("failed to register blog_posts_created_total");

    pub static ref COMMENTS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "blog_comments_created_total",
        "Comments created"
    )
    .expect("failed to register blog_comments_created_total");

    pub static ref FOLLOWS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "blog_follows_created_total",
        "Follow edges created"
    )
    .expect("failed to register blog_follows_created_total");
}

pub fn record_request(method: &str, route: &str, status: u16, elapsed_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, route, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, route])
        .observe(elapsed_secs);
}

pub fn record_index_cache(result: &str) {
    INDEX_CACHE_LOOKUPS.with_label_values(&[result]).inc();
}

/// `GET /metrics` in the Prometheus text format
pub async fn serve_metrics() -> Result<HttpResponse> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| AppError::Internal(format!("Failed to encode metrics: {}", e)))?;

    Ok(HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer))
}
