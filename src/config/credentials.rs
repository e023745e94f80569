//! API Credential Management
//!
//! Xchange API key and secret, loaded from the environment or an options
//! file. Secrets are masked whenever they are formatted.

use serde::Deserialize;
use std::fmt;

/// Secure string wrapper that masks sensitive data in logs
///
/// Debug output shows only `SecretString(***)` and Display shows the
/// truncated form `first4...last4`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: String) -> Self {
        SecretString(value)
    }

    /// Returns the raw secret. Only for signing and request headers.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Returns a masked version of the secret for safe logging
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "***".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString(***)")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        SecretString::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        SecretString::new(s.to_string())
    }
}

/// Xchange API credentials
///
/// The key alone unlocks the API-keyed tier; signed endpoints also need the
/// secret.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    /// API key sent in the `X-MBX-APIKEY` header
    pub api_key: Option<SecretString>,
    /// Secret used for HMAC-SHA256 request signatures
    pub api_secret: Option<SecretString>,
}

impl Credentials {
    pub fn new(api_key: impl Into<SecretString>, api_secret: impl Into<SecretString>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            api_secret: Some(api_secret.into()),
        }
    }

    /// Loads credentials from environment variables
    ///
    /// Reads `XCHANGE_API_KEY` and `XCHANGE_API_SECRET`, trimming whitespace.
    /// Returns `Err` with a descriptive message if either is missing or empty.
    pub fn from_env() -> Result<Self, String> {
        let api_key = std::env::var("XCHANGE_API_KEY")
            .map_err(|_| "XCHANGE_API_KEY not set".to_string())?;

        let api_secret = std::env::var("XCHANGE_API_SECRET")
            .map_err(|_| "XCHANGE_API_SECRET not set".to_string())?;

        let api_key = api_key.trim().to_string();
        let api_secret = api_secret.trim().to_string();

        if api_key.is_empty() {
            return Err("XCHANGE_API_KEY is empty after trimming whitespace".to_string());
        }
        if api_secret.is_empty() {
            return Err("XCHANGE_API_SECRET is empty after trimming whitespace".to_string());
        }

        Ok(Self::new(api_key, api_secret))
    }

    pub fn has_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    pub fn has_secret(&self) -> bool {
        self.api_secret.as_ref().is_some_and(|s| !s.is_empty())
    }
}
