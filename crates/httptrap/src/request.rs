//! Pending request slots and the test-facing respond handle.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::Error;
use crate::key::MatchKey;

/// Lifecycle state of a pending request slot.
///
/// A slot leaves [`Pending`](SlotState::Pending) at most once; every later
/// transition attempt observes the terminal state and is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Pending,
    Responded,
    Cancelled,
    TimedOut,
    Faulted,
}

pub(crate) type Outcome = Result<Response<Bytes>, Error>;

struct SlotInner {
    state: SlotState,
    sender: Option<oneshot::Sender<Outcome>>,
}

/// Single-assignment response slot shared between the respond handle, the
/// caller's future and the timeout/cancellation watcher.
pub(crate) struct Slot {
    key: MatchKey,
    inner: Mutex<SlotInner>,
    settled: CancellationToken,
}

impl Slot {
    fn new(key: MatchKey, sender: oneshot::Sender<Outcome>) -> Self {
        Self {
            key,
            inner: Mutex::new(SlotInner {
                state: SlotState::Pending,
                sender: Some(sender),
            }),
            settled: CancellationToken::new(),
        }
    }

    /// The state check and the transition are one atomic step; the first
    /// completer wins and every later attempt sees the terminal state.
    fn complete(&self, next: SlotState, outcome: Outcome) -> Result<(), Error> {
        let sender = {
            let mut inner = self.inner.lock();
            if inner.state != SlotState::Pending {
                return Err(Error::AlreadySettled { state: inner.state });
            }
            inner.state = next;
            inner.sender.take()
        };
        if let Some(sender) = sender {
            // The caller may have dropped its future; the outcome is then
            // discarded, which is fine — the slot is settled either way.
            let _ = sender.send(outcome);
        }
        self.settled.cancel();
        Ok(())
    }

    pub(crate) fn state(&self) -> SlotState {
        self.inner.lock().state
    }

    /// Signal observed by the watcher task to stop its timers once the slot
    /// is settled through any path.
    pub(crate) fn settled_token(&self) -> CancellationToken {
        self.settled.clone()
    }

    /// Caller-side cancellation. A no-op if another transition already won.
    pub(crate) fn try_cancel(&self) {
        let _ = self.complete(SlotState::Cancelled, Err(Error::Cancelled));
    }

    /// Request-timeout expiry. A no-op if another transition already won.
    pub(crate) fn try_time_out(&self) {
        let outcome = Err(Error::RequestTimeout {
            expectation: self.key.to_string(),
        });
        if self.complete(SlotState::TimedOut, outcome).is_ok() {
            warn!(key = %self.key, "mock request timed out without a matching expectation");
        }
    }

    /// Engine-teardown fault. A no-op if another transition already won.
    pub(crate) fn try_fault(&self) {
        let outcome = Err(Error::EngineClosed {
            expectation: self.key.to_string(),
        });
        let _ = self.complete(SlotState::Faulted, outcome);
    }
}

/// A matched (or still queued) intercepted request.
///
/// Exposes the original request data for assertions and the respond
/// operations that settle the slot and unblock the caller under test.
pub struct TestRequest {
    request: Request<Bytes>,
    slot: Arc<Slot>,
}

impl TestRequest {
    pub(crate) fn new(key: MatchKey, request: Request<Bytes>) -> (Self, oneshot::Receiver<Outcome>) {
        let (sender, receiver) = oneshot::channel();
        let slot = Arc::new(Slot::new(key, sender));
        (Self { request, slot }, receiver)
    }

    pub(crate) fn key(&self) -> &MatchKey {
        &self.slot.key
    }

    pub(crate) fn slot(&self) -> &Arc<Slot> {
        &self.slot
    }

    /// The original request issued by the code under test.
    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    /// The request body decoded as UTF-8, lossily.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.request.body())
    }

    /// Current state of the response slot.
    pub fn state(&self) -> SlotState {
        self.slot.state()
    }

    /// Respond with an empty 200 OK.
    pub fn respond_ok(&self) -> Result<(), Error> {
        self.respond_status(StatusCode::OK)
    }

    /// Respond with the given status and an empty body.
    pub fn respond_status(&self, status: StatusCode) -> Result<(), Error> {
        self.respond(status, Bytes::new())
    }

    /// Respond with a 200 OK carrying the given body.
    pub fn respond_body(&self, body: impl Into<Bytes>) -> Result<(), Error> {
        self.respond(StatusCode::OK, body)
    }

    /// Respond with the given status and body.
    pub fn respond(&self, status: StatusCode, body: impl Into<Bytes>) -> Result<(), Error> {
        let mut response = Response::new(body.into());
        *response.status_mut() = status;
        self.respond_response(response)
    }

    /// Respond with a fully built response. The general form every other
    /// respond variant funnels into; fails with an invalid-state error if the
    /// slot already reached a terminal state.
    pub fn respond_response(&self, response: Response<Bytes>) -> Result<(), Error> {
        self.slot.complete(SlotState::Responded, Ok(response))
    }
}

impl fmt::Debug for TestRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRequest")
            .field("key", &self.slot.key.to_string())
            .field("state", &self.state())
            .finish()
    }
}
