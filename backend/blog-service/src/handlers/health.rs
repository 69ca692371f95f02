use actix_web::{web, HttpResponse, Responder};
use page_cache::CacheKey;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

use crate::app_state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    database: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    checks: HashMap<String, ComponentCheck>,
    timestamp: String,
}

/// Basic health check (store connectivity only)
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = state.store.health_check().await.is_ok();

    HttpResponse::Ok().json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if healthy { "healthy" } else { "unhealthy" }.to_string(),
    })
}

/// Readiness check.
///
/// The store is critical; an unreachable page cache only degrades the
/// service because pages are rendered from the store when it fails.
///
/// Returns 200 when ready, 503 otherwise.
pub async fn readiness_check(state: web::Data<AppState>) -> impl Responder {
    let mut checks = HashMap::new();
    let mut overall_status = ComponentStatus::Healthy;

    let start = Instant::now();
    let store_check = match state.store.health_check().await {
        Ok(()) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "Store reachable".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => {
            overall_status = ComponentStatus::Unhealthy;
            ComponentCheck {
                status: ComponentStatus::Unhealthy,
                message: format!("Store check failed: {}", e),
                latency_ms: None,
            }
        }
    };
    checks.insert("store".to_string(), store_check);

    let start = Instant::now();
    let ping_key = CacheKey::page("health", "ping");
    let cache_check = match state.page_cache.get(&ping_key).await {
        Ok(_) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: format!("Page cache ({}) reachable", state.page_cache.backend()),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => {
            if overall_status == ComponentStatus::Healthy {
                overall_status = ComponentStatus::Degraded;
            }
            ComponentCheck {
                status: ComponentStatus::Degraded,
                message: format!("Page cache check failed: {}", e),
                latency_ms: None,
            }
        }
    };
    checks.insert("page_cache".to_string(), cache_check);

    let ready = overall_status != ComponentStatus::Unhealthy;
    let body = ReadinessResponse {
        ready,
        status: overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

/// Liveness check (process is up)
pub async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "alive" }))
}
