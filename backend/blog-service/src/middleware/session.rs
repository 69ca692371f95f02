/// Session resolution middleware
/// Reads the session token and adds the signed-in `Viewer` to request extensions
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::services::SESSION_COOKIE;

/// The signed-in user of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: i64,
    pub username: String,
}

/// Session middleware factory
pub struct SessionMiddleware;

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
}

fn session_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            // Read the token and state before touching extensions mutably
            let token = session_token(&req);
            let state = req.app_data::<web::Data<AppState>>().cloned();

            if let (Some(token), Some(state)) = (token, state) {
                match state.sessions.verify(&token) {
                    Ok(claims) => match state.store.find_user(claims.sub).await {
                        Ok(Some(user)) => {
                            req.extensions_mut().insert(Viewer {
                                id: user.id,
                                username: user.username,
                            });
                        }
                        Ok(None) => {
                            tracing::debug!(user_id = claims.sub, "session user no longer exists");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to load session user");
                        }
                    },
                    Err(e) => {
                        tracing::debug!("Session validation failed: {}", e);
                    }
                }
            }

            service.call(req).await
        })
    }
}

impl FromRequest for Viewer {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<Viewer>().cloned() {
            Some(viewer) => ready(Ok(viewer)),
            None => ready(Err(AppError::Unauthorized(
                "No signed-in user".to_string(),
            ))),
        }
    }
}
