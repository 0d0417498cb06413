//! Authentication configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authentication configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret used to verify bearer tokens. Accepts `env:VAR_NAME`.
    /// Without a secret every caller is anonymous.
    pub jwt_secret: Option<String>,
}

/// Problems with the auth configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("environment variable '{0}' referenced by jwt_secret is not set")]
    EnvVarNotFound(String),

    #[error("environment variable '{0}' referenced by jwt_secret is empty")]
    EnvVarEmpty(String),
}

impl AuthConfig {
    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        match &self.jwt_secret {
            None => Ok(None),
            Some(value) if value.is_empty() => Ok(None),
            Some(value) => {
                if let Some(var_name) = value.strip_prefix("env:") {
                    match std::env::var(var_name) {
                        Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                        Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                        Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
                    }
                } else {
                    Ok(Some(value.clone()))
                }
            }
        }
    }
}
