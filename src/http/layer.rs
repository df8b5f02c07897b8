//! Tower layer applying the transport hook to every outbound request.
//!
//! Wraps any client service over `hyper::Request<B>`: rewrite the URI's
//! query parameters, mediate the request, then hand it to the inner
//! service. A mediation failure never reaches the inner service.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use hyper::{Request, Uri};
use tower::{BoxError, Layer, Service};
use url::{Position, Url};

use crate::error::{MediationError, MediationResult};
use crate::http::hook::TransportHook;
use crate::http::request::MediatedRequest;

/// Layer producing [`Attested`] services.
#[derive(Clone)]
pub struct AttestationLayer {
    hook: Arc<dyn TransportHook>,
}

impl AttestationLayer {
    pub fn new(hook: Arc<dyn TransportHook>) -> Self {
        Self { hook }
    }
}

impl<S> Layer<S> for AttestationLayer {
    type Service = Attested<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Attested {
            inner,
            hook: Arc::clone(&self.hook),
        }
    }
}

/// Client service with attestation mediation in front of `S`.
#[derive(Clone)]
pub struct Attested<S> {
    inner: S,
    hook: Arc<dyn TransportHook>,
}

impl<S, B> Service<Request<B>> for Attested<S>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // The ready clone goes into the future; a fresh clone stays behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let hook = Arc::clone(&self.hook);

        Box::pin(async move {
            rewrite_uri(hook.as_ref(), &mut req).await?;
            hook.mediate(&mut req).await?;
            inner.call(req).await.map_err(Into::into)
        })
    }
}

/// Run the URL rewrite over the request's target URL. An origin-form request
/// keeps its origin form; only its path and query are replaced.
async fn rewrite_uri<B: Send>(hook: &dyn TransportHook, req: &mut Request<B>) -> MediationResult<()> {
    let Ok(url) = Url::parse(&MediatedRequest::url(req)) else {
        return Ok(());
    };
    let rewritten = hook.rewrite_url(&url).await?;
    if rewritten == url {
        return Ok(());
    }

    let target = if req.uri().scheme().is_some() {
        &rewritten[..]
    } else {
        &rewritten[Position::BeforePath..]
    };
    *req.uri_mut() = target.parse::<Uri>().map_err(|e| {
        MediationError::Permanent(format!("rewritten URL is not a valid URI: {e}"))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tower::util::BoxCloneService;
    use tower::{service_fn, ServiceExt};
    use crate::attestation::mock::MockAttester;
    use crate::attestation::types::{FetchOutcome, FetchStatus};
    use crate::http::request::installed_verifier;
    use crate::net::pinning::tests::AcceptAll;
    use crate::service::AttestationService;

    type Seen = Arc<Mutex<Vec<(String, Option<String>, bool)>>>;

    fn client(seen: Seen) -> BoxCloneService<Request<()>, (), BoxError> {
        BoxCloneService::new(service_fn(move |req: Request<()>| {
            let seen = seen.clone();
            async move {
                let token = req
                    .headers()
                    .get("Approov-Token")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                seen.lock()
                    .unwrap()
                    .push((req.uri().to_string(), token, installed_verifier(&req).is_some()));
                Ok::<_, BoxError>(())
            }
        }))
    }

    fn service(mock: MockAttester) -> Arc<AttestationService> {
        let service = AttestationService::new(Arc::new(mock), Arc::new(AcceptAll));
        service.initialize("cfg").unwrap();
        Arc::new(service)
    }

    #[tokio::test]
    async fn test_layer_rewrites_and_mediates() {
        let mock = MockAttester::default().with_secret("abc123", FetchOutcome::secret("SECRET_XYZ"));
        let service = service(mock);
        service.store().add_substitution_query_param("token");
        let seen: Seen = Arc::default();

        let attested = AttestationLayer::new(service).layer(client(seen.clone()));
        let req = Request::builder()
            .uri("https://api.example.com/v1?token=abc123&id=plain")
            .body(())
            .unwrap();
        attested.oneshot(req).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0],
            (
                "https://api.example.com/v1?token=SECRET_XYZ&id=plain".to_string(),
                Some("TOKEN".to_string()),
                true
            )
        );
    }

    #[tokio::test]
    async fn test_layer_failure_skips_inner() {
        let mock = MockAttester::default().with_token(FetchOutcome::new(FetchStatus::MitmDetected));
        let service = service(mock);
        let seen: Seen = Arc::default();

        let attested = AttestationLayer::new(service).layer(client(seen.clone()));
        let req = Request::builder().uri("https://api.example.com/v1").body(()).unwrap();
        let err = attested.oneshot(req).await.unwrap_err();

        let mediation = err.downcast_ref::<MediationError>().unwrap();
        assert!(mediation.is_retryable());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_layer_rewrites_origin_form_request() {
        let mock = MockAttester::default().with_secret("abc123", FetchOutcome::secret("SECRET_XYZ"));
        let service = service(mock);
        service.store().add_substitution_query_param("token");
        let seen: Seen = Arc::default();

        let attested = AttestationLayer::new(service).layer(client(seen.clone()));
        let req = Request::builder()
            .uri("/v1?token=abc123")
            .header("Host", "api.example.com")
            .body(())
            .unwrap();
        attested.oneshot(req).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0],
            ("/v1?token=SECRET_XYZ".to_string(), Some("TOKEN".to_string()), true)
        );
    }
}
