//! Route configuration
//!
//! Login-required resources are wrapped with `LoginRequired`, which runs
//! after the app-wide `SessionMiddleware` has resolved the viewer.

use actix_web::web;

use crate::error::AppError;
use crate::handlers;
use crate::metrics::serve_metrics;
use crate::middleware::LoginRequired;

/// Configure all routes for the application
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Unparseable ids in the path are unknown resources
        .app_data(web::PathConfig::default().error_handler(|err, req| {
            tracing::debug!(path = %req.path(), error = %err, "path did not match");
            AppError::NotFound(req.path().to_string()).into()
        }))
        // Operational endpoints
        .route("/health", web::get().to(handlers::health_check))
        .route("/health/ready", web::get().to(handlers::readiness_check))
        .route("/health/live", web::get().to(handlers::liveness_check))
        .route("/metrics", web::get().to(serve_metrics))
        // Posts
        .route("/", web::get().to(handlers::index))
        .route("/group/{slug}/", web::get().to(handlers::group_posts))
        .route("/posts/{post_id}/", web::get().to(handlers::post_detail))
        .service(
            web::resource("/create/")
                .wrap(LoginRequired)
                .route(web::get().to(handlers::post_create_form))
                .route(web::post().to(handlers::post_create)),
        )
        .service(
            web::resource("/posts/{post_id}/edit/")
                .wrap(LoginRequired)
                .route(web::get().to(handlers::post_edit_form))
                .route(web::post().to(handlers::post_edit)),
        )
        .service(
            web::resource("/posts/{post_id}/comment/")
                .wrap(LoginRequired)
                .route(web::post().to(handlers::add_comment)),
        )
        // Follows
        .service(
            web::resource("/follow/")
                .wrap(LoginRequired)
                .route(web::get().to(handlers::follow_index)),
        )
        .route("/profile/{username}/", web::get().to(handlers::profile))
        .service(
            web::resource("/profile/{username}/follow/")
                .wrap(LoginRequired)
                .route(web::get().to(handlers::profile_follow))
                .route(web::post().to(handlers::profile_follow)),
        )
        .service(
            web::resource("/profile/{username}/unfollow/")
                .wrap(LoginRequired)
                .route(web::get().to(handlers::profile_unfollow))
                .route(web::post().to(handlers::profile_unfollow)),
        )
        // Accounts
        .service(
            web::scope("/auth")
                .route("/signup/", web::get().to(handlers::signup_form))
                .route("/signup/", web::post().to(handlers::signup))
                .route("/login/", web::get().to(handlers::login_form))
                .route("/login/", web::post().to(handlers::login))
                .route("/logout/", web::get().to(handlers::logout))
                .route("/logout/", web::post().to(handlers::logout)),
        )
        // Static pages
        .route("/about/author/", web::get().to(handlers::about_author))
        .route("/about/tech/", web::get().to(handlers::about_tech));
}
