//! The rendezvous engine: interception and expectation entry points.

use std::future::Future;

use bytes::Bytes;
use http::{Method, Request, Response, Uri};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::Error;
use crate::key::MatchKey;
use crate::rendezvous::{ClaimOutcome, RendezvousStore, WaiterHandle};
use crate::request::TestRequest;

/// Pairs intercepted requests with expectations, in whichever order the two
/// sides arrive.
///
/// Each handler owns its own store, so any number of engines can run
/// concurrently in one process without interference. Most suites use it
/// through [`MockHttp`](crate::MockHttp) rather than directly.
pub struct MockHandler {
    store: RendezvousStore,
    settings: Settings,
}

impl MockHandler {
    pub fn new(settings: Settings) -> Self {
        Self {
            store: RendezvousStore::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn key_for(&self, method: Method, uri: &Uri) -> MatchKey {
        MatchKey::new(method, uri, self.settings.uri_comparison())
    }

    /// Intercept one outgoing request.
    ///
    /// Queues the request, arms the request timeout and the cancellation
    /// listener, and returns the future the code under test awaits. The
    /// future settles exactly once: with the mocked response, or with a
    /// timeout, cancellation or teardown error.
    ///
    /// Must be called from within a Tokio runtime; the timeout and
    /// cancellation watcher runs as a spawned task.
    pub fn intercept(
        &self,
        request: Request<Bytes>,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Response<Bytes>, Error>> + Send + 'static {
        let key = self.key_for(request.method().clone(), request.uri());
        debug!(key = %key, "intercepted outgoing request");

        let (test_request, receiver) = TestRequest::new(key, request);
        let slot = test_request.slot().clone();
        let timeout = self.settings.request_timeout();

        // Timeout and cancellation race against an explicit respond; each is
        // an attempted transition into a terminal state and losers are no-ops.
        tokio::spawn(async move {
            let settled = slot.settled_token();
            tokio::select! {
                _ = cancel.cancelled() => slot.try_cancel(),
                _ = tokio::time::sleep(timeout) => slot.try_time_out(),
                _ = settled.cancelled() => {}
            }
        });

        self.store.enqueue_request(test_request);

        async move {
            match receiver.await {
                Ok(outcome) => outcome,
                // The sender is only ever dropped after delivering an outcome,
                // so a closed channel means the engine vanished mid-flight.
                Err(_) => Err(Error::Cancelled),
            }
        }
    }

    /// Claim the oldest intercepted request matching `method` + `uri`.
    ///
    /// Fast path: the request is already queued and is returned immediately.
    /// Otherwise a waiter is registered and the call blocks, bounded by the
    /// expectation timeout, until a matching request arrives. Each request
    /// satisfies at most one expectation.
    pub async fn expect(&self, method: Method, uri: Uri) -> Result<TestRequest, Error> {
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(Error::RelativeUri {
                uri: uri.to_string(),
            });
        }
        let key = self.key_for(method, &uri);

        let waiter = match self.store.claim_or_register(&key) {
            ClaimOutcome::Claimed(request) => return Ok(request),
            ClaimOutcome::Wait(waiter) => waiter,
        };

        let WaiterHandle { id, receiver } = waiter;
        match tokio::time::timeout(self.settings.expectation_timeout(), receiver).await {
            Ok(Ok(())) => {
                // Signaled: the matching request must still be queued.
                self.store.try_dequeue(&key).ok_or_else(|| {
                    warn!(key = %key, "waiter was signaled but found no queued request");
                    Error::StoreDesync {
                        expectation: key.to_string(),
                    }
                })
            }
            // The sender is only dropped unsignaled at engine teardown: no
            // request is coming, so this is a plain miss.
            Ok(Err(_)) => Err(Error::NoMatch {
                expectation: key.to_string(),
                outstanding: self.store.snapshot_outstanding(),
            }),
            Err(_) => self.expire_waiter(key, id),
        }
    }

    /// Expiry path for a registered waiter whose bounded wait ended without
    /// an observed signal.
    fn expire_waiter(&self, key: MatchKey, waiter_id: u64) -> Result<TestRequest, Error> {
        if self.store.remove_waiter(&key, waiter_id) {
            debug!(key = %key, waiter = waiter_id, "expectation timed out");
            return Err(Error::NoMatch {
                expectation: key.to_string(),
                outstanding: self.store.snapshot_outstanding(),
            });
        }

        // The registration is already gone, so a signal won the race with the
        // timer; the request it announced must still be queued.
        self.store.try_dequeue(&key).ok_or_else(|| {
            warn!(key = %key, "signaled waiter raced the timer and found no queued request");
            Error::StoreDesync {
                expectation: key.to_string(),
            }
        })
    }

    /// Fails if any intercepted request has not been claimed by an
    /// expectation. Intended for the end of a test; also runs at engine
    /// teardown unless disabled in [`Settings`].
    pub fn ensure_no_outstanding_requests(&self) -> Result<(), Error> {
        let outstanding = self.store.snapshot_outstanding();
        if outstanding.is_empty() {
            Ok(())
        } else {
            Err(Error::OutstandingRequests { outstanding })
        }
    }

    /// Fault every still-queued request so blocked callers fail immediately.
    /// Returns how many slots were faulted.
    pub(crate) fn fault_outstanding(&self) -> usize {
        self.store.fault_all()
    }
}
