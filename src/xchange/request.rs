//! Request descriptors for the three trust tiers
//!
//! Building a request is pure: the caller supplies the timestamp and the
//! transport in [`client`](crate::xchange::client) executes the result.
//!
//! - **Public**: no API key
//! - **API-keyed**: `X-MBX-APIKEY` header
//! - **Signed**: API key header plus `timestamp`, `recvWindow` and an
//!   HMAC-SHA256 `signature` over the URL-encoded query

use crate::config::Credentials;
use crate::error::XchangeError;
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

pub const USER_AGENT: &str = "Mozilla/4.0 (compatible; Xchange Rust API)";
pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// HTTP method of a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Authentication level of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTier {
    Public,
    ApiKey,
    Signed,
}

/// Ordered query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    /// Adds the parameter only when a value is present
    pub fn with_opt<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    pub fn push(&mut self, key: &str, value: impl ToString) {
        self.0.push((key.to_string(), value.to_string()));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.0.iter()
    }
}

impl From<Vec<(String, String)>> for Params {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Params(pairs)
    }
}

/// Everything the transport needs to send one request
#[derive(Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Full URL, query string included
    pub url: Url,
    /// Query parameters in the order they appear in `url`
    pub query: Params,
    pub headers: Vec<(&'static str, String)>,
    pub tier: AuthTier,
}

impl RequestDescriptor {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// URL path without the query, for logging
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| {
                if *name == API_KEY_HEADER {
                    (*name, "***")
                } else {
                    (*name, value.as_str())
                }
            })
            .collect();

        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &headers)
            .field("tier", &self.tier)
            .finish()
    }
}

/// Hex-encoded HMAC-SHA256 of `payload` keyed by `secret`
pub fn sign_payload(secret: &str, payload: &str) -> Result<String, XchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| XchangeError::InvalidRequest(format!("Invalid secret key: {}", e)))?;

    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Builds request descriptors against one base URL and credential set
#[derive(Clone)]
pub struct RequestBuilder {
    base_url: Url,
    credentials: Credentials,
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("base_url", &self.base_url.as_str())
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl RequestBuilder {
    /// `base_url` must be absolute; endpoints are resolved relative to it
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, XchangeError> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| XchangeError::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

        Ok(Self {
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Public tier: no key
    pub fn public(
        &self,
        method: Method,
        endpoint: &str,
        params: Params,
    ) -> Result<RequestDescriptor, XchangeError> {
        let url = self.url_with_query(endpoint, &params)?;
        Ok(self.descriptor(method, url, params, AuthTier::Public, None))
    }

    /// API-keyed tier: `X-MBX-APIKEY` header, no signature
    pub fn api_keyed(
        &self,
        method: Method,
        endpoint: &str,
        params: Params,
    ) -> Result<RequestDescriptor, XchangeError> {
        let key = self.api_key()?;
        let url = self.url_with_query(endpoint, &params)?;
        Ok(self.descriptor(method, url, params, AuthTier::ApiKey, Some(key)))
    }

    /// Signed tier
    ///
    /// Appends `timestamp` and, unless already given, `recvWindow`, then
    /// signs the encoded query and appends `signature` last.
    pub fn signed(
        &self,
        method: Method,
        endpoint: &str,
        mut params: Params,
        timestamp_ms: i64,
        recv_window_ms: u64,
    ) -> Result<RequestDescriptor, XchangeError> {
        let key = self.api_key()?;
        let secret = self
            .credentials
            .api_secret
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or(XchangeError::MissingCredentials("API secret not configured"))?;

        params.push("timestamp", timestamp_ms);
        if !params.contains("recvWindow") {
            params.push("recvWindow", recv_window_ms);
        }

        let mut url = self.url_with_query(endpoint, &params)?;
        let signature = sign_payload(secret.expose_secret(), url.query().unwrap_or(""))?;
        url.query_pairs_mut().append_pair("signature", &signature);
        params.push("signature", signature);

        Ok(self.descriptor(method, url, params, AuthTier::Signed, Some(key)))
    }

    fn api_key(&self) -> Result<String, XchangeError> {
        self.credentials
            .api_key
            .as_ref()
            .filter(|k| !k.is_empty())
            .map(|k| k.expose_secret().to_string())
            .ok_or(XchangeError::MissingCredentials("API key not configured"))
    }

    fn url_with_query(&self, endpoint: &str, params: &Params) -> Result<Url, XchangeError> {
        let mut url = self.base_url.join(endpoint.trim_start_matches('/')).map_err(|e| {
            XchangeError::InvalidRequest(format!("Invalid endpoint '{}': {}", endpoint, e))
        })?;

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }
        Ok(url)
    }

    fn descriptor(
        &self,
        method: Method,
        url: Url,
        query: Params,
        tier: AuthTier,
        api_key: Option<String>,
    ) -> RequestDescriptor {
        let mut headers = vec![
            ("User-Agent", USER_AGENT.to_string()),
            ("Content-Type", CONTENT_TYPE.to_string()),
        ];
        if let Some(key) = api_key {
            headers.push((API_KEY_HEADER, key));
        }

        RequestDescriptor {
            method,
            url,
            query,
            headers,
            tier,
        }
    }
}
