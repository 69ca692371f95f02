use actix_web::{HttpRequest, HttpResponse};

use crate::error::not_found_page;

/// Default service: any unmatched path
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    tracing::debug!(path = %req.path(), "no route matched");
    HttpResponse::NotFound().json(not_found_page(Some(req.path())))
}
