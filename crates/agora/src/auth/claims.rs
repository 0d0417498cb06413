//! JWT claims.

use serde::{Deserialize, Serialize};

/// Claims accepted on bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject.
    pub sub: String,

    /// Expiration time (as Unix timestamp).
    pub exp: i64,

    /// Issued at (as Unix timestamp).
    #[serde(default)]
    pub iat: Option<i64>,

    /// Platform username.
    #[serde(default)]
    pub username: Option<String>,

    /// OIDC preferred username.
    #[serde(default)]
    pub preferred_username: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

impl Claims {
    /// The username the caller acts as: `username`, then
    /// `preferred_username`, then `sub`.
    pub fn username(&self) -> &str {
        self.username
            .as_deref()
            .or(self.preferred_username.as_deref())
            .unwrap_or(&self.sub)
    }
}
