/// Request logging middleware
///
/// Logs the start and completion of every HTTP request and wraps the
/// request in a span carrying a per-request id, so every event emitted by
/// the handlers can be correlated.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
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
        let start_time = Instant::now();
        let request_id = Uuid::new_v4();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let query = req.query_string().to_string();

        let span = tracing::info_span!(
            "http_request",
            %request_id,
            %method,
            %path
        );

        let service = self.service.clone();

        Box::pin(
            async move {
                tracing::info!("Request started");
                if !query.is_empty() {
                    tracing::info!(query = %query, "Query string");
                }

                let res = service.call(req).await?;

                let elapsed = start_time.elapsed();
                tracing::info!(
                    status = res.status().as_u16(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Request completed"
                );

                Ok(res)
            }
            .instrument(span),
        )
    }
}
