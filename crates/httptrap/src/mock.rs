//! Facade bundling the engine with test-facing conveniences.

use std::sync::Arc;

use http::{Method, Uri};

use crate::client::MockClient;
use crate::config::Settings;
use crate::error::Error;
use crate::handler::MockHandler;
use crate::request::TestRequest;

/// Entry point for tests: owns one rendezvous engine and hands out
/// [`MockClient`] handles for the code under test.
///
/// When dropped with `fail_on_outstanding` set (the default), panics if any
/// intercepted request was never claimed by an expectation, so forgotten
/// assertions fail the test instead of passing silently. Any request still
/// pending at teardown is faulted, unblocking its caller immediately.
pub struct MockHttp {
    handler: Arc<MockHandler>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            handler: Arc::new(MockHandler::new(settings)),
        }
    }

    /// A cloneable client handle to hand to the code under test.
    pub fn client(&self) -> MockClient {
        MockClient::new(Arc::clone(&self.handler))
    }

    /// Direct access to the underlying engine.
    pub fn handler(&self) -> &MockHandler {
        &self.handler
    }

    /// Expect a GET request to `uri` and claim it.
    pub async fn expect(&self, uri: &str) -> Result<TestRequest, Error> {
        self.expect_method(Method::GET, uri).await
    }

    /// Expect a request with the given method and URI and claim it.
    ///
    /// If several matching requests are queued, the oldest is returned; each
    /// request may be claimed only once.
    pub async fn expect_method(&self, method: Method, uri: &str) -> Result<TestRequest, Error> {
        let parsed: Uri = uri.parse().map_err(|source| Error::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;
        self.handler.expect(method, parsed).await
    }

    /// Fails if any intercepted request has not been claimed.
    pub fn ensure_no_outstanding_requests(&self) -> Result<(), Error> {
        self.handler.ensure_no_outstanding_requests()
    }
}

impl Default for MockHttp {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MockHttp {
    fn drop(&mut self) {
        let check = if self.handler.settings().fail_on_outstanding && !std::thread::panicking() {
            self.handler.ensure_no_outstanding_requests()
        } else {
            Ok(())
        };
        // Unblock any caller still awaiting before surfacing the failure.
        self.handler.fault_outstanding();
        if let Err(err) = check {
            panic!("{err}");
        }
    }
}
