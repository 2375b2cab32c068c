//! Error types for the myPlant domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external collaborator has its own error enum; handlers decide how
//! (or whether) each one reaches the caller.

use thiserror::Error;

/// Errors from an LLM provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    /// HTTP 429. `code` carries the provider's error sub-code
    /// (e.g. `insufficient_quota`) when the body had one.
    #[error("Rate limited by provider{}, retry after {retry_after_secs}s", code_suffix(.code))]
    RateLimited {
        code: Option<String>,
        retry_after_secs: u64,
    },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}

impl ProviderError {
    /// Sub-code reported when the account has run out of quota.
    pub const INSUFFICIENT_QUOTA: &'static str = "insufficient_quota";

    /// Whether this is a rate-limit error caused by an exhausted quota.
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { code: Some(code), .. } if code == Self::INSUFFICIENT_QUOTA
        )
    }
}

/// Errors from the document store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Store not configured: {0}")]
    NotConfigured(String),

    #[error("Query on '{collection}' failed: {reason}")]
    QueryFailed { collection: String, reason: String },

    #[error("Malformed document {collection}/{id}: {reason}")]
    Malformed {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("Network error: {0}")]
    Network(String),
}

/// Errors from the push-notification service.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),

    #[error("Push delivery to {target} failed: {reason}")]
    DeliveryFailed { target: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),
}

/// Typed failures returned to callable clients.
///
/// Only handlers whose caller can act on a structured failure return these;
/// conversational handlers degrade to text instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallableError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Internal(String),
}

impl CallableError {
    /// The wire status string of the callable protocol.
    pub fn status(&self) -> &'static str {
        match self {
            CallableError::Unauthenticated(_) => "UNAUTHENTICATED",
            CallableError::PermissionDenied(_) => "PERMISSION_DENIED",
            CallableError::Internal(_) => "INTERNAL",
        }
    }

    /// The HTTP status code the callable protocol pairs with [`Self::status`].
    pub fn http_status(&self) -> u16 {
        match self {
            CallableError::Unauthenticated(_) => 401,
            CallableError::PermissionDenied(_) => 403,
            CallableError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 500,
            message: "upstream exploded".into(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[test]
    fn rate_limit_display_includes_code() {
        let err = ProviderError::RateLimited {
            code: Some("insufficient_quota".into()),
            retry_after_secs: 5,
        };
        assert!(err.to_string().contains("insufficient_quota"));

        let plain = ProviderError::RateLimited {
            code: None,
            retry_after_secs: 5,
        };
        assert_eq!(plain.to_string(), "Rate limited by provider, retry after 5s");
    }

    #[test]
    fn quota_detection_requires_sub_code() {
        let quota = ProviderError::RateLimited {
            code: Some(ProviderError::INSUFFICIENT_QUOTA.into()),
            retry_after_secs: 5,
        };
        let busy = ProviderError::RateLimited {
            code: Some("rate_limit_exceeded".into()),
            retry_after_secs: 5,
        };
        assert!(quota.is_quota_exhausted());
        assert!(!busy.is_quota_exhausted());
        assert!(!ProviderError::Network("down".into()).is_quota_exhausted());
    }

    #[test]
    fn callable_error_statuses() {
        let err = CallableError::PermissionDenied("Only admins can access encryption keys".into());
        assert_eq!(err.status(), "PERMISSION_DENIED");
        assert_eq!(err.http_status(), 403);
        assert_eq!(err.to_string(), "Only admins can access encryption keys");
        assert_eq!(CallableError::Unauthenticated(String::new()).http_status(), 401);
        assert_eq!(CallableError::Internal(String::new()).status(), "INTERNAL");
    }
}
