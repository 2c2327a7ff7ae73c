//! Client-side adapter handed to the code under test.

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Method, Request, Response, Uri};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::handler::MockHandler;

/// Cloneable handle the code under test sends requests through.
///
/// Every request is routed into the engine's interception entry point and
/// suspends until the test responds (or the request times out). Also usable
/// as a [`tower::Service`], so subjects written against a generic HTTP
/// service need no test-specific seam.
#[derive(Clone)]
pub struct MockClient {
    handler: Arc<MockHandler>,
}

impl MockClient {
    pub(crate) fn new(handler: Arc<MockHandler>) -> Self {
        Self { handler }
    }

    /// Send a request and await the mock response.
    pub async fn request(&self, request: Request<Bytes>) -> Result<Response<Bytes>, Error> {
        self.handler
            .intercept(request, CancellationToken::new())
            .await
    }

    /// Send a request whose pending future is cancelled when `cancel` fires.
    pub fn request_with_cancel(
        &self,
        request: Request<Bytes>,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Response<Bytes>, Error>> + Send + 'static {
        self.handler.intercept(request, cancel)
    }

    /// GET the given URI with an empty body.
    pub async fn get(&self, uri: &str) -> Result<Response<Bytes>, Error> {
        self.send(Method::GET, uri, Bytes::new()).await
    }

    /// POST the given body to the URI.
    pub async fn post(&self, uri: &str, body: impl Into<Bytes>) -> Result<Response<Bytes>, Error> {
        self.send(Method::POST, uri, body.into()).await
    }

    async fn send(&self, method: Method, uri: &str, body: Bytes) -> Result<Response<Bytes>, Error> {
        let uri: Uri = uri.parse().map_err(|source| Error::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;
        let mut request = Request::new(body);
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        self.request(request).await
    }
}

impl tower::Service<Request<Bytes>> for MockClient {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        Box::pin(self.handler.intercept(request, CancellationToken::new()))
    }
}
