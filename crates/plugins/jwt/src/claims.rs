//! Claims carried by platform push tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims of an OIDC token a platform attaches to a push delivery.
///
/// `aud` and `iss` are checked by the decoder itself and are not kept here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushTokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (the signing service account's unique id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Service account email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Whether the issuer verified the email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

impl PushTokenClaims {
    /// Checks expiry against `now` (Unix seconds). A token is live only
    /// while `exp > now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }

    /// Gets the expiration time as a DateTime.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Returns the email only when the issuer vouches for it.
    pub fn verified_email(&self) -> Option<&str> {
        match self.email_verified {
            Some(true) => self.email.as_deref(),
            _ => None,
        }
    }
}
