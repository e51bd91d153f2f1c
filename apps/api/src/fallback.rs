//! Two-path computation shared by the ATS scorer, the job source and the match ranker.
//!
//! The preferred path runs under a deadline. If it errors or times out, the
//! fallback path runs and the result carries a `Degraded` marker naming the stage
//! and the reason. Degradation is logged here, once, for every caller.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degraded {
    pub stage: &'static str,
    pub reason: String,
}

#[derive(Debug)]
pub enum Outcome<T> {
    Primary(T),
    Fallback(T, Degraded),
}

impl<T> Outcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            Outcome::Primary(value) | Outcome::Fallback(value, _) => value,
        }
    }

    pub fn degradation(&self) -> Option<&Degraded> {
        match self {
            Outcome::Primary(_) => None,
            Outcome::Fallback(_, degraded) => Some(degraded),
        }
    }
}

/// Runs `primary` with `deadline`; on error or timeout runs `fallback`.
///
/// Dropping `primary` on timeout is the only cancellation: anything it owns
/// (a budget permit, a pending request) is released by its destructor.
pub async fn with_fallback<T, E, P, F, Fut>(
    stage: &'static str,
    deadline: Duration,
    primary: P,
    fallback: F,
) -> Outcome<T>
where
    E: Display,
    P: Future<Output = Result<T, E>>,
    F: FnOnce(Degraded) -> Fut,
    Fut: Future<Output = T>,
{
    let reason = match tokio::time::timeout(deadline, primary).await {
        Ok(Ok(value)) => return Outcome::Primary(value),
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("timed out after {}ms", deadline.as_millis()),
    };

    warn!(stage, reason = %reason, "Primary path failed, using fallback");

    let degraded = Degraded { stage, reason };
    let value = fallback(degraded.clone()).await;
    Outcome::Fallback(value, degraded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_primary_success_is_not_degraded() {
        let outcome = with_fallback(
            "test",
            Duration::from_secs(1),
            async { Ok::<_, String>(7) },
            |_| async { 0 },
        )
        .await;

        assert!(outcome.degradation().is_none());
        assert_eq!(outcome.into_inner(), 7);
    }

    #[tokio::test]
    async fn test_primary_error_runs_fallback_with_reason() {
        let outcome = with_fallback(
            "oracle",
            Duration::from_secs(1),
            async { Err::<i32, _>("connection refused") },
            |_| async { 3 },
        )
        .await;

        let degraded = outcome.degradation().cloned().unwrap();
        assert_eq!(degraded.stage, "oracle");
        assert_eq!(degraded.reason, "connection refused");
        assert_eq!(outcome.into_inner(), 3);
    }

    #[tokio::test]
    async fn test_timeout_runs_fallback() {
        tokio::time::pause();

        let outcome = with_fallback(
            "provider",
            Duration::from_secs(10),
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, String>(1)
            },
            |_| async { -1 },
        )
        .await;

        assert!(outcome
            .degradation()
            .map(|d| d.reason.contains("timed out"))
            .unwrap_or(false));
        assert_eq!(outcome.into_inner(), -1);
    }
}
