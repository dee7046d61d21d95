//! Tower layer for rate limiting in Axum.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use http::{HeaderName, HeaderValue, Request, Response, StatusCode, header};
use tower::{Layer, Service};
use tracing::error;

use crate::key::{HasHeaders, HasUserId};
use crate::limiter::Limiter;
use crate::response::{Admission, RejectionBody};

/// Request extension naming the signed-in user.
///
/// Insert it from the authentication middleware so user-keyed limiters can
/// see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// Tower layer for rate limiting.
#[derive(Debug, Clone)]
pub struct RateLimitLayer {
    limiter: Arc<Limiter>,
}

impl RateLimitLayer {
    /// Create a new rate limit layer.
    pub fn new(limiter: Arc<Limiter>) -> Self {
        Self { limiter }
    }
}

impl<Inner> Layer<Inner> for RateLimitLayer {
    type Service = RateLimitService<Inner>;

    fn layer(&self, inner: Inner) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// The rate limiting service.
#[derive(Debug, Clone)]
pub struct RateLimitService<Inner> {
    inner: Inner,
    limiter: Arc<Limiter>,
}

/// Wrapper around Axum request for key extraction.
struct AxumRequest<'a> {
    request: &'a Request<Body>,
}

impl HasHeaders for AxumRequest<'_> {
    fn header(&self, name: &str) -> Option<&str> {
        self.request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
    }
}

impl HasUserId for AxumRequest<'_> {
    fn user_id(&self) -> Option<&str> {
        self.request
            .extensions()
            .get::<AuthenticatedUser>()
            .map(|user| user.0.as_str())
    }
}

impl<Inner> Service<Request<Body>> for RateLimitService<Inner>
where
    Inner: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    Inner::Future: Send,
{
    type Response = Response<Body>;
    type Error = Inner::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let decision = self.limiter.check(&AxumRequest { request: &request });

        let admission = match decision {
            Ok(result) => Admission::render(&result),
            Err(err) => {
                error!(error = %err, "rate limiter unavailable");
                return Box::pin(async {
                    Ok::<_, Inner::Error>(status_response(StatusCode::INTERNAL_SERVER_ERROR))
                });
            }
        };

        // Take the service that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match admission {
                Admission::Proceed { headers } => {
                    let mut response = inner.call(request).await?;
                    add_rate_limit_headers(&mut response, &headers);
                    Ok(response)
                }
                Admission::Reject { headers, body, .. } => {
                    Ok(rate_limited_response(&headers, &body))
                }
            }
        })
    }
}

/// Add rate limit headers to a response.
fn add_rate_limit_headers(response: &mut Response<Body>, headers: &[(&'static str, String)]) {
    let target = response.headers_mut();
    for (name, value) in headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            target.insert(name, value);
        }
    }
}

/// Create a 429 Too Many Requests response.
fn rate_limited_response(
    headers: &[(&'static str, String)],
    body: &RejectionBody,
) -> Response<Body> {
    let mut response = Response::new(Body::from(body.to_json()));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    add_rate_limit_headers(&mut response, headers);
    response
}

fn status_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::LimiterConfig;
    use crate::reclaimer::ReclaimInterval;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    fn limiter(max: u64) -> Arc<Limiter> {
        Arc::new(
            Limiter::new(
                LimiterConfig::new("layer", max, Duration::from_secs(60))
                    .with_reclaim(ReclaimInterval::Manual),
            )
            .unwrap(),
        )
    }

    fn request(ip: &str) -> Request<Body> {
        Request::builder()
            .uri("/api/data")
            .header("x-real-ip", ip)
            .body(Body::empty())
            .unwrap()
    }

    async fn ok(_request: Request<Body>) -> Result<Response<Body>, Infallible> {
        Ok(Response::new(Body::from("ok")))
    }

    #[tokio::test]
    async fn test_layer_allows_then_rejects() {
        let layer = RateLimitLayer::new(limiter(1));

        let response = layer.layer(tower::service_fn(ok)).oneshot(request("1.1.1.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

        let response = layer.layer(tower::service_fn(ok)).oneshot(request("1.1.1.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let response = layer.layer(tower::service_fn(ok)).oneshot(request("2.2.2.2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    /// Inner service that counts how often it is cloned.
    #[derive(Default)]
    struct CloneCounter {
        clones: Arc<AtomicUsize>,
    }

    impl Clone for CloneCounter {
        fn clone(&self) -> Self {
            self.clones.fetch_add(1, Ordering::SeqCst);
            Self {
                clones: self.clones.clone(),
            }
        }
    }

    impl Service<Request<Body>> for CloneCounter {
        type Response = Response<Body>;
        type Error = Infallible;
        type Future = std::future::Ready<Result<Response<Body>, Infallible>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _request: Request<Body>) -> Self::Future {
            std::future::ready(Ok(Response::new(Body::empty())))
        }
    }

    #[tokio::test]
    async fn test_server_error_keeps_ready_inner_service() {
        let limiter = limiter(5);
        let inner = CloneCounter::default();
        let clones = inner.clones.clone();
        let mut service = RateLimitLayer::new(limiter.clone()).layer(inner);

        limiter.destroy();
        let response = service.ready().await.unwrap().call(request("1.1.1.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(clones.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_admitted_request_swaps_in_clone() {
        let inner = CloneCounter::default();
        let clones = inner.clones.clone();
        let mut service = RateLimitLayer::new(limiter(5)).layer(inner);

        let response = service.ready().await.unwrap().call(request("1.1.1.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(clones.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_layer_destroyed_limiter_is_server_error() {
        let limiter = limiter(5);
        limiter.destroy();

        let response = RateLimitLayer::new(limiter)
            .layer(tower::service_fn(ok))
            .oneshot(request("1.1.1.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
