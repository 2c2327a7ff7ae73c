//! Error types surfaced to test code and to the code under test.

use crate::request::SlotState;

/// Errors raised by the engine.
///
/// Everything here is reported synchronously to the immediate caller, either
/// as a return value or through the intercepted call's future; nothing is
/// logged and swallowed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The expectation URI could not be parsed.
    #[error("invalid uri `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: http::uri::InvalidUri,
    },
    /// The expectation URI has no scheme or authority.
    #[error("expectation uri `{uri}` is not absolute")]
    RelativeUri { uri: String },
    /// No matching request arrived within the expectation timeout.
    #[error("expected request was not matched: [{expectation}]; outstanding requests: [{}]", format_outstanding(.outstanding))]
    NoMatch {
        expectation: String,
        outstanding: Vec<String>,
    },
    /// A waiter was signaled but the matching request had vanished on
    /// re-check. Indicates a bug in the matching protocol, not test timing.
    #[error("rendezvous desync for [{expectation}]: waiter was signaled but no matching request was queued")]
    StoreDesync { expectation: String },
    /// A respond call hit a slot already in a terminal state.
    #[error("{}", settled_message(.state))]
    AlreadySettled { state: SlotState },
    /// Requests were made but never claimed by an expectation.
    #[error("there are still outstanding requests: [{}]", format_outstanding(.outstanding))]
    OutstandingRequests { outstanding: Vec<String> },
    /// The intercepted call stayed pending past the request timeout.
    #[error("the mock request [{expectation}] timed out; either it is being awaited without a matching expectation or the code under test exceeded the configured request timeout")]
    RequestTimeout { expectation: String },
    /// The caller's cancellation signal fired before a response was supplied.
    #[error("the request was cancelled before a response was supplied")]
    Cancelled,
    /// The engine was torn down while the request was still pending.
    #[error("the engine was dropped while the request [{expectation}] was still pending")]
    EngineClosed { expectation: String },
}

fn format_outstanding(entries: &[String]) -> String {
    entries
        .iter()
        .map(|entry| format!("[{entry}]"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn settled_message(state: &SlotState) -> &'static str {
    match state {
        SlotState::Responded => "this request has already been responded to",
        SlotState::Cancelled => "this request was cancelled and cannot be responded to",
        SlotState::TimedOut => "this request timed out and cannot be responded to",
        SlotState::Faulted => "this request faulted and cannot be responded to",
        SlotState::Pending => "this request is still pending",
    }
}
