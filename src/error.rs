use thiserror::Error;

use crate::depth::DepthError;

/// Main error type for the Xchange client
#[derive(Error, Debug)]
pub enum XchangeError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Depth(#[from] DepthError),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl XchangeError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            XchangeError::ConnectionError(_) | XchangeError::RateLimitError(_)
        )
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            XchangeError::ConnectionError(_) => "connection_error",
            XchangeError::RateLimitError(_) => "rate_limit",
            XchangeError::Api { .. } => "api_error",
            XchangeError::ParseError(_) => "parse_error",
            XchangeError::MissingCredentials(_) => "missing_credentials",
            XchangeError::InvalidRequest(_) => "invalid_request",
            XchangeError::Config(_) => "config_error",
            XchangeError::Depth(_) => "depth_error",
            XchangeError::InternalError(_) => "internal_error",
        }
    }

    /// Builds the error for a non-success HTTP response.
    ///
    /// 429 and 418 keep their rate limit / ban meaning; everything else keeps
    /// the exchange's response body untouched for the caller.
    pub(crate) fn from_status(status: u16, body: String) -> Self {
        match status {
            429 => XchangeError::RateLimitError(format!(
                "Too many requests to Xchange API. Retry after 60 seconds. {}",
                body
            )),
            418 => XchangeError::ConnectionError(
                "IP address banned by Xchange. Please contact support.".to_string(),
            ),
            _ => XchangeError::Api { status, body },
        }
    }
}

impl From<reqwest::Error> for XchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            XchangeError::ConnectionError(
                "Request timeout. Please check your internet connection.".to_string(),
            )
        } else if err.is_connect() {
            XchangeError::ConnectionError(
                "Failed to connect to Xchange API. Please check your internet connection."
                    .to_string(),
            )
        } else if err.is_decode() {
            XchangeError::ParseError(format!("Invalid response body: {}", err))
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                429 => XchangeError::RateLimitError(
                    "Too many requests to Xchange API. Retry after 60 seconds.".to_string(),
                ),
                500..=599 => XchangeError::ConnectionError(format!(
                    "Xchange server error (HTTP {}). Please try again later.",
                    status.as_u16()
                )),
                _ => XchangeError::InternalError(format!("HTTP error: {}", status)),
            }
        } else {
            XchangeError::InternalError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for XchangeError {
    fn from(err: serde_json::Error) -> Self {
        XchangeError::ParseError(format!("JSON parsing failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, XchangeError>;
