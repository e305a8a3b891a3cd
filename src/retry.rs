//! Exponential backoff for transient SDK errors (throttling,
//! eventual-consistency windows). Permission errors never retry.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::DeployerError;
use crate::settings::RetryPolicy;

/// Returns true for errors a retry could plausibly fix. Permission
/// failures are excluded on purpose — retrying them just wastes the
/// backoff budget before failing anyway.
fn is_retryable(err: &DeployerError) -> bool {
    match err {
        DeployerError::ResourceCreation { cause, .. } | DeployerError::ResourceDeletion { cause, .. } => {
            !is_permission_denied(cause)
        }
        DeployerError::Deployment { reason, .. } => !is_permission_denied(reason),
        DeployerError::IaCTool { .. } | DeployerError::IaCToolMissing { .. } => false,
        DeployerError::Configuration { .. }
        | DeployerError::ProviderNotFound { .. }
        | DeployerError::Validation(_) => false,
        DeployerError::Io(_) | DeployerError::Json(_) | DeployerError::Other(_) => true,
    }
}

fn is_permission_denied(cause: &str) -> bool {
    let lower = cause.to_ascii_lowercase();
    lower.contains("permission") || lower.contains("access denied") || lower.contains("forbidden")
}

/// Runs `op`, retrying on retryable failures with exponential backoff
/// per `policy`. Gives up and returns the last error once `max_attempts`
/// is reached, or immediately on a non-retryable error.
pub async fn with_backoff<F, Fut, T>(policy: &RetryPolicy, op_name: &str, mut op: F) -> Result<T, DeployerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DeployerError>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= policy.max_attempts || !is_retryable(&err) => return Err(err),
            Err(err) => {
                warn!(
                    operation = op_name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    "retrying after transient failure: {err}"
                );
                tokio::time::sleep(delay).await;
                delay = Duration::from_secs_f64(delay.as_secs_f64() * policy.backoff_factor);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(&fast_policy(), "test-op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DeployerError::Other("transient".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permission_errors_never_retry() {
        let calls = AtomicU32::new(0);
        let err = with_backoff(&fast_policy(), "test-op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Err::<(), _>(DeployerError::deployment("L1", "aws", "AccessDenied: permission denied"))
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DeployerError::Deployment { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
