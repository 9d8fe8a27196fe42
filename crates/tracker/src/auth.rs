//! Request authentication.

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// How the token is presented to the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// Personal access token as the password of an empty-user Basic header.
    #[default]
    Basic,
    /// OAuth access token in a Bearer header.
    Bearer,
}

/// An opaque access token supplied by the caller.
///
/// Never serialised and redacted from `Debug` output.
#[derive(Clone)]
pub struct Credential {
    scheme: AuthScheme,
    token: String,
}

impl Credential {
    pub fn new(scheme: AuthScheme, token: impl Into<String>) -> Self {
        Self {
            scheme,
            token: token.into(),
        }
    }

    /// Reads the token from environment variable `var`.
    pub fn from_env(scheme: AuthScheme, var: &str) -> Result<Self, TrackerError> {
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(scheme, token)),
            _ => Err(TrackerError::MissingToken {
                var: var.to_string(),
            }),
        }
    }

    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.scheme {
            AuthScheme::Basic => request.basic_auth("", Some(&self.token)),
            AuthScheme::Bearer => request.bearer_auth(&self.token),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("scheme", &self.scheme)
            .field("token", &"<redacted>")
            .finish()
    }
}
