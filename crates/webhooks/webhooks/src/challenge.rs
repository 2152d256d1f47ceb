//! Subscription challenge-response.
//!
//! Platforms confirm endpoint ownership with a `GET` carrying `hub.mode`,
//! `hub.verify_token` and `hub.challenge`. The challenge is echoed only when
//! the mode is `subscribe` and the token matches the organization's verify
//! token. Every other outcome is the same opaque rejection.

use hookgate_core::timing_safe_eq;
use serde::Deserialize;

/// The only mode that is answered.
pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Opaque challenge rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Challenge rejected")]
pub struct ChallengeRejected;

/// Returns `challenge` unchanged iff `mode` is `subscribe` and `token`
/// equals `expected_token`.
///
/// Both checks are evaluated before deciding, and the token comparison is
/// constant-time.
pub fn verify_challenge(
    mode: &str,
    token: &str,
    challenge: &str,
    expected_token: &str,
) -> Result<String, ChallengeRejected> {
    let mode_ok = timing_safe_eq(mode.as_bytes(), SUBSCRIBE_MODE.as_bytes());
    let token_ok = !expected_token.is_empty()
        & timing_safe_eq(token.as_bytes(), expected_token.as_bytes());

    if mode_ok & token_ok {
        Ok(challenge.to_string())
    } else {
        Err(ChallengeRejected)
    }
}

/// Query parameters of a subscription handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChallengeQuery {
    /// `hub.mode`
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    /// `hub.verify_token`
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    /// `hub.challenge`
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

impl ChallengeQuery {
    /// Creates a query with all three parameters.
    pub fn new(
        mode: impl Into<String>,
        verify_token: impl Into<String>,
        challenge: impl Into<String>,
    ) -> Self {
        Self {
            mode: Some(mode.into()),
            verify_token: Some(verify_token.into()),
            challenge: Some(challenge.into()),
        }
    }

    /// Answers the handshake against `expected_token`. Missing parameters
    /// reject.
    pub fn answer(&self, expected_token: &str) -> Result<String, ChallengeRejected> {
        let (Some(mode), Some(token), Some(challenge)) = (
            self.mode.as_deref(),
            self.verify_token.as_deref(),
            self.challenge.as_deref(),
        ) else {
            return Err(ChallengeRejected);
        };
        verify_challenge(mode, token, challenge, expected_token)
    }
}
