//! Bearer token providers.
//!
//! The client asks its provider for a fresh token once per vault call. How the
//! token is obtained (service account exchange, a secrets manager, a static
//! value in tests) is up to the provider.

use std::fmt;

use log::error;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{BoxError, ClientError};

/// Supplies bearer tokens for vault calls.
///
/// Any `Fn() -> Result<String, E>` closure is a provider:
///
/// ```
/// use skyflow_client::TokenProvider;
///
/// let provider = || -> Result<String, std::io::Error> { Ok("token".to_string()) };
/// assert!(provider.bearer_token().is_ok());
/// ```
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::TokenError`] if no token could be obtained.
    fn bearer_token(&self) -> Result<SecretString, ClientError>;
}

impl<F, E> TokenProvider for F
where
    F: Fn() -> Result<String, E> + Send + Sync,
    E: Into<BoxError>,
{
    fn bearer_token(&self) -> Result<SecretString, ClientError> {
        let token = self().map_err(|e| ClientError::TokenError(e.into()))?;
        non_empty(SecretString::from(token))
    }
}

fn non_empty(token: SecretString) -> Result<SecretString, ClientError> {
    if token.expose_secret().trim().is_empty() {
        error!("Token provider returned an empty token");
        return Err(ClientError::TokenError(
            "token provider returned an empty token".into(),
        ));
    }
    Ok(token)
}

/// Provider that always returns the same token.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    /// Creates a provider for `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn bearer_token(&self) -> Result<SecretString, ClientError> {
        non_empty(self.token.clone())
    }
}

// Custom Debug implementation to avoid exposing the token
impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Provider that reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    /// Creates a provider reading `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// Name of the variable read by this provider.
    #[must_use]
    pub fn var(&self) -> &str {
        &self.var
    }
}

impl TokenProvider for EnvTokenProvider {
    fn bearer_token(&self) -> Result<SecretString, ClientError> {
        let token = std::env::var(&self.var).map_err(|e| {
            error!("Failed to read bearer token from {}: {e}", self.var);
            ClientError::TokenError(format!("{}: {e}", self.var).into())
        })?;
        non_empty(SecretString::from(token))
    }
}
