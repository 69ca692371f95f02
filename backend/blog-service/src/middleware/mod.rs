pub mod login_required;
pub mod metrics;
/// Middleware implementations
pub mod session;

// Middleware modules:
// - session: resolves the signed-in viewer from the session cookie or Bearer header
// - login_required: redirects anonymous requests to the login page
// - metrics: Prometheus request counters and latency
// - Request logging: handled by tracing_actix_web::TracingLogger

pub use login_required::{login_redirect_url, LoginRequired, LOGIN_URL};
pub use metrics::MetricsMiddleware;
pub use session::{SessionMiddleware, Viewer};
