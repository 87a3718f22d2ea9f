//! Store error types

use thiserror::Error;

/// Store-related errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key material or signature could not be turned into a credential
    #[error("Credential error: {0}")]
    Credential(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API error from store
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Rate limited by store
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// The requested release track does not exist for the package
    #[error("Track '{track}' not found for {package}")]
    TrackNotFound { package: String, track: String },

    /// Discarding a draft edit failed
    #[error("Failed to discard edit {edit_id}: {message}")]
    SessionCleanup { edit_id: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JWT error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Export error
    #[error("Export error: {0}")]
    Metadata(#[from] storemeta_metadata::MetadataError),
}

impl StoreError {
    /// True for credential failures, which disable a whole backend for the run.
    pub fn is_credential(&self) -> bool {
        matches!(self, StoreError::Credential(_))
    }

    /// True for failures of a single fetch against a store backend.
    pub fn is_backend_request(&self) -> bool {
        matches!(
            self,
            StoreError::ApiError { .. }
                | StoreError::RateLimited { .. }
                | StoreError::TrackNotFound { .. }
                | StoreError::AuthenticationFailed(_)
                | StoreError::Http(_)
                | StoreError::Json(_)
        )
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(StoreError::Credential("bad key".to_string()).is_credential());

        let not_found = StoreError::TrackNotFound {
            package: "com.example.app".to_string(),
            track: "production".to_string(),
        };
        assert!(not_found.is_backend_request());
        assert!(!not_found.is_credential());

        let api = StoreError::ApiError {
            status: 401,
            message: "NOT_AUTHORIZED".to_string(),
        };
        assert!(api.is_backend_request());
        assert_eq!(api.to_string(), "API error: 401 - NOT_AUTHORIZED");

        assert!(!StoreError::ConfigurationError("x".to_string()).is_backend_request());
    }
}
