//! Pre-flight checks for mutating and model-consuming requests.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::user::Caller;

/// Why a request was stopped by the guard.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("Unauthorized")]
    NotAuthenticated,
    #[error("Too many requests. Please try again later.")]
    RateLimited,
    #[error("Rate limiting is unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Conclusion {
    Allow,
    Deny,
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("decision service answered {0}")]
    Status(u16),
}

/// Source of rate-limit decisions.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn decide(&self, identity: &str, requested: u32) -> Result<Conclusion, RateLimitError>;
}

#[derive(Debug, Serialize)]
struct DecisionRequest<'a> {
    identity: &'a str,
    requested: u32,
}

#[derive(Debug, Deserialize)]
struct DecisionResponse {
    conclusion: Conclusion,
}

/// Rate limiter backed by an HTTP decision endpoint.
///
/// Posts `{identity, requested}` and reads `{conclusion: "ALLOW" | "DENY"}`.
#[derive(Clone, Debug)]
pub struct HttpRateLimiter {
    client: Client,
    url: String,
}

impl HttpRateLimiter {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl RateLimiter for HttpRateLimiter {
    async fn decide(&self, identity: &str, requested: u32) -> Result<Conclusion, RateLimitError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&DecisionRequest {
                identity,
                requested,
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(RateLimitError::Status(resp.status().as_u16()));
        }
        Ok(resp.json::<DecisionResponse>().await?.conclusion)
    }
}

#[derive(Clone, Default)]
pub struct AbuseGuard {
    limiter: Option<Arc<dyn RateLimiter>>,
    fail_closed: bool,
}

impl AbuseGuard {
    /// A guard that only checks authentication.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Whether limiter failures let the request through (the default).
    #[must_use]
    pub fn fail_open(mut self, fail_open: bool) -> Self {
        self.fail_closed = !fail_open;
        self
    }

    /// Returns the caller's identity when the request may proceed.
    pub async fn check(&self, caller: &Caller) -> Result<String, GuardError> {
        let identity = caller.username().ok_or(GuardError::NotAuthenticated)?;

        let Some(limiter) = &self.limiter else {
            return Ok(identity.to_string());
        };
        match limiter.decide(identity, 1).await {
            Ok(Conclusion::Allow) => Ok(identity.to_string()),
            Ok(Conclusion::Deny) => {
                tracing::info!(identity, "request rate limited");
                Err(GuardError::RateLimited)
            }
            Err(err) if self.fail_closed => {
                tracing::error!(identity, error = %err, "rate limiter failed, rejecting");
                Err(GuardError::Unavailable(err.to_string()))
            }
            Err(err) => {
                tracing::warn!(identity, error = %err, "rate limiter failed, allowing");
                Ok(identity.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLimiter(Option<Conclusion>);

    #[async_trait]
    impl RateLimiter for FixedLimiter {
        async fn decide(&self, _: &str, requested: u32) -> Result<Conclusion, RateLimitError> {
            assert_eq!(requested, 1);
            self.0.ok_or(RateLimitError::Status(503))
        }
    }

    fn alice() -> Caller {
        Caller::new(Some("alice".to_string()))
    }

    #[tokio::test]
    async fn anonymous_caller_is_rejected() {
        let guard = AbuseGuard::new().limiter(Arc::new(FixedLimiter(Some(Conclusion::Allow))));
        assert_eq!(
            guard.check(&Caller::new(None)).await,
            Err(GuardError::NotAuthenticated)
        );
    }

    #[tokio::test]
    async fn no_limiter_allows_authenticated_callers() {
        assert_eq!(AbuseGuard::new().check(&alice()).await.unwrap(), "alice");
    }

    #[tokio::test]
    async fn denial_is_rate_limited() {
        let guard = AbuseGuard::new().limiter(Arc::new(FixedLimiter(Some(Conclusion::Deny))));
        assert_eq!(guard.check(&alice()).await, Err(GuardError::RateLimited));
    }

    #[tokio::test]
    async fn limiter_failure_fails_open_by_default() {
        let guard = AbuseGuard::new().limiter(Arc::new(FixedLimiter(None)));
        assert_eq!(guard.check(&alice()).await.unwrap(), "alice");
    }

    #[tokio::test]
    async fn limiter_failure_can_fail_closed() {
        let guard = AbuseGuard::new()
            .limiter(Arc::new(FixedLimiter(None)))
            .fail_open(false);
        assert!(matches!(
            guard.check(&alice()).await,
            Err(GuardError::Unavailable(_))
        ));
    }

    #[test]
    fn conclusion_wire_format() {
        let parsed: DecisionResponse = serde_json::from_str(r#"{"conclusion":"DENY"}"#).unwrap();
        assert_eq!(parsed.conclusion, Conclusion::Deny);
        let body = serde_json::to_value(DecisionRequest {
            identity: "alice",
            requested: 1,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"identity": "alice", "requested": 1}));
    }
}
