//! In-process test double for HTTP clients.
//!
//! Intercepts outgoing requests made by code under test, lets the test
//! assert that specific requests occurred, and lets it feed back mock
//! responses to unblock the caller. Requests and expectations rendezvous in
//! whichever order they arrive: a request queued before the expectation is
//! claimed immediately, an expectation issued first waits (briefly) for the
//! request. Both sides are guarded by timeouts so a forgotten expectation
//! fails the test fast instead of hanging it.
//!
//! ```
//! use http::StatusCode;
//! use httptrap::MockHttp;
//!
//! # tokio_test::block_on(async {
//! let http = MockHttp::new();
//! let client = http.client();
//!
//! // The code under test issues a call and awaits the response.
//! let call = tokio::spawn(async move { client.get("http://some-website.com/some-path").await });
//!
//! // The test claims the request and feeds back a mock response.
//! let request = http.expect("http://some-website.com/some-path").await.unwrap();
//! request.respond(StatusCode::OK, "123").unwrap();
//!
//! let response = call.await.unwrap().unwrap();
//! assert_eq!(response.body(), "123");
//!
//! http.ensure_no_outstanding_requests().unwrap();
//! # });
//! ```
//!
//! All state is in-memory and owned by one [`MockHttp`] instance; engines
//! never share anything, so tests can run as many of them concurrently as
//! they like.

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod key;
pub mod mock;
pub mod request;

// Internal matching state; reached only through the handler.
mod rendezvous;

pub use client::MockClient;
pub use config::Settings;
pub use error::Error;
pub use handler::MockHandler;
pub use key::{MatchKey, UriComparison};
pub use mock::MockHttp;
pub use request::{SlotState, TestRequest};
