//! Endpoint Failover
//!
//! Every registry operation runs through [`with_failover`], which spreads load
//! across equivalent replicas and survives transient failures.
//!
//! ## Algorithm
//!
//! ```text
//! endpoints: [A, B, C]     start = random index, e.g. 1
//!
//!   attempt 0 ─▶ B ── 5xx / transport error ──┐
//!   attempt 1 ─▶ C ── 5xx / transport error ──┤  retriable: next endpoint
//!   attempt 2 ─▶ A ── 200 ─────────────────────▶ Ok(body)
//!
//!   4xx / decode error at any attempt ─────────▶ Err immediately
//!   attempt == retries and still failing ──────▶ Err(last error)
//! ```
//!
//! `retries` counts *additional* attempts, so the total is `retries + 1`.
//! With more attempts than endpoints the rotation wraps around.
//!
//! ## Retryable vs Non-Retryable Errors
//!
//! **Retryable**: `Transport`, `Timeout`, `Server` (5xx)
//!
//! **Non-Retryable**: `Client` (4xx), `Decode`, and everything else; these
//! would fail the same way on any replica.

use crate::error::Result;
use rand::Rng;
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

/// How many times to fail over before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailoverPolicy {
    /// Additional attempts after the first one
    pub retries: usize,
}

impl FailoverPolicy {
    pub fn new(retries: usize) -> Self {
        Self { retries }
    }
}

/// Pick a uniformly random starting endpoint.
pub fn random_start(endpoint_count: usize) -> usize {
    if endpoint_count <= 1 {
        return 0;
    }
    rand::thread_rng().gen_range(0..endpoint_count)
}

/// Run `operation` against the endpoints in round-robin order from `start`.
///
/// The endpoint list must be non-empty; an empty list is rejected at
/// configuration time.
pub async fn with_failover<E, F, Fut, T>(
    endpoints: &[E],
    policy: FailoverPolicy,
    start: usize,
    mut operation: F,
) -> Result<T>
where
    E: fmt::Display,
    F: FnMut(&E) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    debug_assert!(!endpoints.is_empty());
    let mut attempt = 0;

    loop {
        let endpoint = &endpoints[(start + attempt) % endpoints.len()];

        match operation(endpoint).await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        attempt = attempt + 1,
                        endpoint = %endpoint,
                        "Registry call succeeded after failover"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_retriable() {
                    return Err(err);
                }

                if attempt >= policy.retries {
                    warn!(
                        attempt = attempt + 1,
                        retries = policy.retries,
                        endpoint = %endpoint,
                        error = %err,
                        "Registry retries exhausted, giving up"
                    );
                    return Err(err);
                }

                warn!(
                    attempt = attempt + 1,
                    retries = policy.retries,
                    endpoint = %endpoint,
                    error = %err,
                    "Retriable registry failure, trying next endpoint"
                );
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use std::sync::Mutex;

    fn endpoints(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn server_error() -> RegistryError {
        RegistryError::from_status(500, br#"{"error_code":50001,"message":"boom"}"#)
    }

    #[test]
    fn test_random_start_in_range() {
        assert_eq!(random_start(0), 0);
        assert_eq!(random_start(1), 0);
        for _ in 0..100 {
            assert!(random_start(3) < 3);
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let eps = endpoints(&["a", "b"]);
        let seen = Mutex::new(Vec::new());

        let result = with_failover(&eps, FailoverPolicy::new(2), 1, |ep| {
            seen.lock().unwrap().push(ep.to_string());
            async { Ok::<_, RegistryError>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(*seen.lock().unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_round_robin_from_start() {
        let eps = endpoints(&["a", "b", "c"]);
        let seen = Mutex::new(Vec::new());

        let result = with_failover(&eps, FailoverPolicy::new(3), 2, |ep| {
            seen.lock().unwrap().push(ep.to_string());
            let ep = ep.to_string();
            async move {
                if ep == "b" {
                    Ok(ep)
                } else {
                    Err(server_error())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "b");
        assert_eq!(*seen.lock().unwrap(), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_non_retriable_returns_immediately() {
        let eps = endpoints(&["a", "b", "c"]);
        let calls = Mutex::new(0);

        let result: Result<()> = with_failover(&eps, FailoverPolicy::new(3), 0, |_| {
            *calls.lock().unwrap() += 1;
            async { Err(RegistryError::from_status(404, b"")) }
        })
        .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_retry_budget_counts_additional_attempts() {
        let eps = endpoints(&["a", "b"]);
        let seen = Mutex::new(Vec::new());

        let result: Result<()> = with_failover(&eps, FailoverPolicy::new(4), 0, |ep| {
            seen.lock().unwrap().push(ep.to_string());
            async { Err(server_error()) }
        })
        .await;

        assert!(matches!(
            result,
            Err(RegistryError::Server {
                status: 500,
                error_code: Some(50001),
                ..
            })
        ));
        // 1 + 4 retries, wrapping around the two endpoints
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "a", "b", "a"]);
    }

    #[tokio::test]
    async fn test_zero_retries_single_attempt() {
        let eps = endpoints(&["a", "b", "c"]);
        let calls = Mutex::new(0);

        let result: Result<()> = with_failover(&eps, FailoverPolicy::new(0), 0, |_| {
            *calls.lock().unwrap() += 1;
            async { Err(server_error()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
