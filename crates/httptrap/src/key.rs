//! Match key derivation for pairing intercepted requests with expectations.

use std::fmt;
use std::hash::{Hash, Hasher};

use http::{Method, Uri};

/// How URI strings are compared when pairing requests with expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UriComparison {
    /// ASCII case-insensitive comparison. URIs are technically case-sensitive,
    /// but in practice they are rarely used as such.
    #[default]
    IgnoreCase,
    /// Byte-for-byte comparison.
    Exact,
}

/// Identity used to pair an intercepted request with an expectation.
///
/// Two keys are equal iff the methods are equal and the URI strings are equal
/// under the comparison mode the keys were built with. Hashing is consistent
/// with equality: the case-folded form is hashed. The comparison mode is fixed
/// per engine at construction time, so keys from the same engine always agree.
#[derive(Debug, Clone)]
pub struct MatchKey {
    method: Method,
    uri: String,
    folded: String,
}

impl MatchKey {
    pub fn new(method: Method, uri: &Uri, comparison: UriComparison) -> Self {
        let uri = uri.to_string();
        let folded = match comparison {
            UriComparison::IgnoreCase => uri.to_ascii_lowercase(),
            UriComparison::Exact => uri.clone(),
        };
        Self {
            method,
            uri,
            folded,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The URI exactly as it appeared on the request or expectation.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl PartialEq for MatchKey {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method && self.folded == other.folded
    }
}

impl Eq for MatchKey {}

impl Hash for MatchKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.method.hash(state);
        self.folded.hash(state);
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.uri)
    }
}
