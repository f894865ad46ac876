//! Normalized client errors.

use serde_json::Value;

/// Every failure the client can report.
///
/// Non-accepted statuses keep the JSON error body returned by the API, or an
/// empty object when the body was not JSON.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad credentials or a token the API would not verify.
    #[error("Authentication failed ({status}): {errors}")]
    Auth { status: u16, errors: Value },

    /// Duplicate username or invalid registration fields.
    #[error("Registration failed ({status}): {errors}")]
    Registration { status: u16, errors: Value },

    /// Any other non-accepted status on an authenticated call.
    #[error("Api request failed ({status}): {errors}")]
    Request { status: u16, errors: Value },

    /// Call attempted before a token was installed. Never sent to the network.
    #[error("Please authorize first")]
    Unauthorized,

    /// Connection-level failure.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Accepted status with a body that does not match the expected record.
    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status carried by the error, if the API answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth { status, .. }
            | ApiError::Registration { status, .. }
            | ApiError::Request { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::Unauthorized | ApiError::Decode(_) => None,
        }
    }

    /// Error body returned by the API. Empty object when there was none.
    pub fn errors(&self) -> Value {
        match self {
            ApiError::Auth { errors, .. }
            | ApiError::Registration { errors, .. }
            | ApiError::Request { errors, .. } => errors.clone(),
            _ => Value::Object(Default::default()),
        }
    }

    /// True for the local missing-token guard and for a remote 401.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized) || self.status() == Some(401)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_includes_error_body() {
        let err = ApiError::Request {
            status: 400,
            errors: json!({"title": ["post with this title already exists."]}),
        };
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("already exists"));
    }

    #[test]
    fn test_unauthorized_classification() {
        assert!(ApiError::Unauthorized.is_unauthorized());
        assert!(ApiError::Request {
            status: 401,
            errors: json!({})
        }
        .is_unauthorized());
        assert!(!ApiError::Auth {
            status: 400,
            errors: json!({})
        }
        .is_unauthorized());
        assert_eq!(ApiError::Unauthorized.status(), None);
        assert_eq!(ApiError::Unauthorized.errors(), json!({}));
    }
}
