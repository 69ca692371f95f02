/// Login-required guard
/// Anonymous requests are redirected to the login page before the handler runs
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, HttpResponse,
};
use futures_util::future::LocalBoxFuture;
use std::rc::Rc;

use super::Viewer;

/// Path of the login page
pub const LOGIN_URL: &str = "/auth/login/";

/// `/auth/login/?next=<path>` with `/` kept readable
pub fn login_redirect_url(next: &str) -> String {
    format!(
        "{}?next={}",
        LOGIN_URL,
        urlencoding::encode(next).replace("%2F", "/")
    )
}

pub struct LoginRequired;

impl<S, B> Transform<S, ServiceRequest> for LoginRequired
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = LoginRequiredService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoginRequiredService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoginRequiredService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoginRequiredService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let signed_in = req.extensions().contains::<Viewer>();
            if signed_in {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            let location = login_redirect_url(req.path());
            tracing::debug!(path = %req.path(), "redirecting anonymous request to login");
            let response = HttpResponse::Found()
                .insert_header((header::LOCATION, location))
                .finish();
            Ok(req.into_response(response).map_into_right_body())
        })
    }
}
