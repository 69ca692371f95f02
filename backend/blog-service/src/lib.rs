/// Blog Service Library
///
/// A blogging backend: authors publish posts, optionally into groups,
/// readers browse paginated listings, comment on posts and follow authors
/// to get a personal feed.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers, one per page
/// - `models`: Entities and joined read projections
/// - `services`: Pagination, password/session handling, media storage
/// - `forms`: Form decoding and validation
/// - `db`: The storage trait with PostgreSQL and in-memory implementations
/// - `middleware`: Session resolution, login guard, request metrics
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

pub use app_state::AppState;
pub use config::Config;
pub use error::{AppError, Result};

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web, App, Error,
};

/// Build the application around `state`.
///
/// Used by the binary and by the integration tests, so both serve the same
/// middleware stack and route table.
pub fn build_app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .wrap(middleware::SessionMiddleware)
        .wrap(middleware::MetricsMiddleware)
        .wrap(tracing_actix_web::TracingLogger::default())
        .configure(routes::configure_routes)
        .default_service(web::to(handlers::not_found))
}
