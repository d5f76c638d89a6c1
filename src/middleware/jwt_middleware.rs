/// JWT Authentication Middleware
///
/// Validates the access token carried by the `Access` cookie and injects
/// the claims into request extensions for use by route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    Error, HttpMessage, HttpResponse, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::validate_access_token;
use crate::configuration::JwtSettings;
use crate::error::ErrorBody;
use crate::routes::ACCESS_COOKIE;

/// JWT middleware for protecting routes
///
/// Must be applied to routes that require authentication. Strict
/// validation: an expired access token is rejected here even when the
/// account still holds a live refresh session.
pub struct JwtMiddleware {
    jwt_config: JwtSettings,
}

impl JwtMiddleware {
    /// Create new JWT middleware instance
    pub fn new(jwt_config: JwtSettings) -> Self {
        Self { jwt_config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
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
        // Extract the access token cookie
        let access_token = req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string());

        match access_token {
            None => {
                tracing::warn!(path = req.path(), "Missing Access cookie");
                let response = HttpResponse::Unauthorized().json(ErrorBody::new(
                    "auth.credentials",
                    &["Missing access token.".to_string()],
                ));
                Box::pin(async move {
                    Err(InternalError::from_response("Unauthorized", response).into())
                })
            }
            Some(token) => match validate_access_token(&token, &self.jwt_config) {
                Ok(claims) => {
                    // Inject claims into request extensions
                    req.extensions_mut().insert(claims.clone());

                    tracing::debug!(
                        username = %claims.sub,
                        role = %claims.role,
                        "JWT validated successfully"
                    );

                    let service = self.service.clone();
                    Box::pin(async move { service.call(req).await })
                }
                Err(e) => {
                    let response = e.error_response();
                    Box::pin(async move {
                        Err(InternalError::from_response("Invalid token", response).into())
                    })
                }
            },
        }
    }
}
