//! Settings controlling matching and timeout behavior.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::key::UriComparison;

/// Settings consumed read-only by a [`MockHttp`](crate::MockHttp) engine.
///
/// The comparison mode and timeouts are fixed for the lifetime of the engine
/// they are handed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Ignore casing when matching URIs. URIs are technically case-sensitive,
    /// but in practice they are rarely used as such.
    #[serde(default = "default_ignore_uri_case")]
    pub ignore_uri_case: bool,
    /// Check for unclaimed requests when the engine is dropped and panic if
    /// any remain.
    #[serde(default = "default_fail_on_outstanding")]
    pub fail_on_outstanding: bool,
    /// How long an intercepted call may stay pending before its future fails.
    /// Guards against awaiting a request that is never expected.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long an expectation waits for a matching request to arrive. Kept
    /// short: this path exists to tolerate small race windows in chained
    /// calls, not to wait indefinitely.
    #[serde(default = "default_expectation_timeout_ms")]
    pub expectation_timeout_ms: u64,
}

fn default_ignore_uri_case() -> bool {
    true
}

fn default_fail_on_outstanding() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_expectation_timeout_ms() -> u64 {
    100
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ignore_uri_case: default_ignore_uri_case(),
            fail_on_outstanding: default_fail_on_outstanding(),
            request_timeout_ms: default_request_timeout_ms(),
            expectation_timeout_ms: default_expectation_timeout_ms(),
        }
    }
}

impl Settings {
    /// Profile with a 1 second request timeout, for suites that would rather
    /// fail fast than wait out the full default.
    pub fn fast_fail() -> Self {
        Self {
            request_timeout_ms: 1_000,
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn expectation_timeout(&self) -> Duration {
        Duration::from_millis(self.expectation_timeout_ms)
    }

    pub(crate) fn uri_comparison(&self) -> UriComparison {
        if self.ignore_uri_case {
            UriComparison::IgnoreCase
        } else {
            UriComparison::Exact
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.ignore_uri_case);
        assert!(settings.fail_on_outstanding);
        assert_eq!(settings.request_timeout(), Duration::from_secs(10));
        assert_eq!(settings.expectation_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn test_fast_fail_profile() {
        let settings = Settings::fast_fail();
        assert_eq!(settings.request_timeout(), Duration::from_secs(1));
        assert_eq!(settings.expectation_timeout_ms, default_expectation_timeout_ms());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"requestTimeoutMs": 250}"#).unwrap();
        assert_eq!(settings.request_timeout(), Duration::from_millis(250));
        assert!(settings.ignore_uri_case);
        assert_eq!(settings.expectation_timeout_ms, 100);
    }
}
