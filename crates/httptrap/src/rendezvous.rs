//! Shared rendezvous state pairing intercepted requests with expectations.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::key::MatchKey;
use crate::request::TestRequest;

/// Registration handed back to an expectation that found no queued request.
pub(crate) struct WaiterHandle {
    pub(crate) id: u64,
    pub(crate) receiver: oneshot::Receiver<()>,
}

/// Result of the expectation entry point's first pass over the store.
pub(crate) enum ClaimOutcome {
    /// A queued request was available; the fast path.
    Claimed(TestRequest),
    /// No request yet; a waiter was registered under the same lock
    /// acquisition so an arrival in between cannot be missed.
    Wait(WaiterHandle),
}

#[derive(Default)]
struct StoreInner {
    pending_requests: HashMap<MatchKey, VecDeque<TestRequest>>,
    pending_waiters: HashMap<MatchKey, VecDeque<(u64, oneshot::Sender<()>)>>,
    next_waiter_id: u64,
}

/// Lock-protected pairing state.
///
/// Both maps live under one mutex: the matching protocol (enqueue-then-signal,
/// check-then-register) requires atomicity across the two, otherwise wakeups
/// get lost or requests matched twice. Scoped to one engine instance, never
/// process-wide.
pub(crate) struct RendezvousStore {
    inner: Mutex<StoreInner>,
}

fn pop_request(
    map: &mut HashMap<MatchKey, VecDeque<TestRequest>>,
    key: &MatchKey,
) -> Option<TestRequest> {
    let queue = map.get_mut(key)?;
    let request = queue.pop_front();
    if queue.is_empty() {
        map.remove(key);
    }
    request
}

impl RendezvousStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Queue an intercepted request and wake the oldest live waiter for its
    /// key. The request stays queued; the signaled waiter dequeues it.
    pub(crate) fn enqueue_request(&self, request: TestRequest) {
        let mut inner = self.inner.lock();
        let key = request.key().clone();
        inner
            .pending_requests
            .entry(key.clone())
            .or_default()
            .push_back(request);
        debug!(key = %key, "queued intercepted request");

        if let Some(waiters) = inner.pending_waiters.get_mut(&key) {
            while let Some((id, sender)) = waiters.pop_front() {
                if sender.send(()).is_ok() {
                    debug!(key = %key, waiter = id, "signaled waiter");
                    break;
                }
                // Receiver gone: that expectation timed out; try the next.
            }
            if waiters.is_empty() {
                inner.pending_waiters.remove(&key);
            }
        }
    }

    /// Fast-path claim, or waiter registration under the same lock
    /// acquisition. The claim yields to already-registered waiters for the
    /// key: the oldest unmatched expectation gets the oldest request.
    pub(crate) fn claim_or_register(&self, key: &MatchKey) -> ClaimOutcome {
        let mut inner = self.inner.lock();
        let has_waiters = inner
            .pending_waiters
            .get(key)
            .is_some_and(|waiters| !waiters.is_empty());
        if !has_waiters {
            if let Some(request) = pop_request(&mut inner.pending_requests, key) {
                debug!(key = %key, "expectation matched on the fast path");
                return ClaimOutcome::Claimed(request);
            }
        }

        let id = inner.next_waiter_id;
        inner.next_waiter_id += 1;
        let (sender, receiver) = oneshot::channel();
        inner
            .pending_waiters
            .entry(key.clone())
            .or_default()
            .push_back((id, sender));
        debug!(key = %key, waiter = id, "registered waiter");
        ClaimOutcome::Wait(WaiterHandle { id, receiver })
    }

    /// Pop the oldest queued request for the key regardless of registered
    /// waiters. Only the signaled-waiter path uses this: being signaled is
    /// what entitles it to the queued request.
    pub(crate) fn try_dequeue(&self, key: &MatchKey) -> Option<TestRequest> {
        let mut inner = self.inner.lock();
        pop_request(&mut inner.pending_requests, key)
    }

    /// Drop a waiter registration after its bounded wait expired. Returns
    /// false when the waiter is already gone, which means a signal was
    /// issued to it and the caller must re-attempt the dequeue.
    pub(crate) fn remove_waiter(&self, key: &MatchKey, id: u64) -> bool {
        let mut inner = self.inner.lock();
        let Some(waiters) = inner.pending_waiters.get_mut(key) else {
            return false;
        };
        let before = waiters.len();
        waiters.retain(|(waiter_id, _)| *waiter_id != id);
        let removed = waiters.len() != before;
        if waiters.is_empty() {
            inner.pending_waiters.remove(key);
        }
        removed
    }

    /// Every still-queued request as `"{method} {uri}"`, in map iteration
    /// order, queue order within a key. Diagnostics only.
    pub(crate) fn snapshot_outstanding(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut entries = Vec::new();
        for (key, queue) in &inner.pending_requests {
            for _ in queue {
                entries.push(key.to_string());
            }
        }
        entries
    }

    /// Drain every queued request and fault its slot. Waiter registrations
    /// are dropped as well, which wakes their expectations into the expiry
    /// path. Used at engine teardown.
    pub(crate) fn fault_all(&self) -> usize {
        let mut inner = self.inner.lock();
        let mut faulted = 0;
        for (_, queue) in inner.pending_requests.drain() {
            for request in queue {
                request.slot().try_fault();
                faulted += 1;
            }
        }
        inner.pending_waiters.clear();
        faulted
    }
}
