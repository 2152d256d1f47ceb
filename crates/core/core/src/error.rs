//! Error types for Hookgate.
//!
//! `GatewayError` covers internal faults: a credential store that fails, a
//! certificate that cannot be fetched, a lookup that times out. None of
//! these ever reach a webhook caller directly. The validator folds every
//! one of them into a `VALIDATION_FAILED` verdict, see
//! [`ErrorReason`](crate::types::ErrorReason) for the externally visible
//! taxonomy.

use thiserror::Error;

/// Internal fault raised while validating a webhook.
#[derive(Debug, Error)]
pub enum GatewayError {
    // ==================== Collaborator Errors ====================
    /// The credential store failed to answer.
    #[error("Credential store error: {message}")]
    CredentialStore { message: String },

    /// A collaborator call exceeded its time budget.
    #[error("Operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// A remote resource (certificate, key set) could not be fetched.
    #[error("Fetch failed for '{url}': {message}")]
    Fetch { url: String, message: String },

    /// The rate limit store failed to record a hit.
    #[error("Rate limit store error: {message}")]
    RateLimitStore { message: String },

    // ==================== Crypto Errors ====================
    /// Key material could not be parsed or used.
    #[error("Key material error: {message}")]
    KeyMaterial { message: String },

    /// Credentials were handed to a verifier that needs a field they lack.
    #[error("Credential field '{field}' is not configured")]
    MissingCredential { field: &'static str },

    // ==================== Configuration Errors ====================
    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ==================== Internal Errors ====================
    /// An internal error occurred.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    /// Creates a new credential store error.
    pub fn credential_store(message: impl Into<String>) -> Self {
        Self::CredentialStore {
            message: message.into(),
        }
    }

    /// Creates a new fetch error.
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a new key material error.
    pub fn key_material(message: impl Into<String>) -> Self {
        Self::KeyMaterial {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the fault came from a collaborator rather than
    /// from the gateway itself.
    pub fn is_collaborator_fault(&self) -> bool {
        matches!(
            self,
            Self::CredentialStore { .. }
                | Self::Timeout { .. }
                | Self::Fetch { .. }
                | Self::RateLimitStore { .. }
        )
    }
}

/// A Result type alias using GatewayError.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GatewayError::Timeout { millis: 2000 };
        assert_eq!(err.to_string(), "Operation timed out after 2000ms");

        let err = GatewayError::MissingCredential { field: "secret" };
        assert_eq!(err.to_string(), "Credential field 'secret' is not configured");
    }

    #[test]
    fn test_is_collaborator_fault() {
        assert!(GatewayError::credential_store("connection reset").is_collaborator_fault());
        assert!(GatewayError::fetch("https://example.com", "404").is_collaborator_fault());
        assert!(!GatewayError::key_material("bad pem").is_collaborator_fault());
    }
}
