// API client module: a small blocking HTTP client that talks to the
// Postman API. Every call is one round trip; nothing is retried and no
// state is kept between calls apart from the credential.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default base URL of the Postman API.
pub const DEFAULT_API_URL: &str = "https://api.postman.com";

/// Header carrying the credential on every request.
pub const API_KEY_HEADER: &str = "x-api-key";

/// HTTP methods the sync needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        };
        f.write_str(s)
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        }
    }
}

/// Classified failure of a single request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, DNS or TLS failure before a response arrived.
    #[error("Network Error: {source}")]
    Network {
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-2xx status.
    #[error("API Error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body was not valid JSON.
    #[error("Parse Error: {reason}")]
    Parse { reason: String },
}

/// The API key. Never empty once constructed.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for an empty or whitespace-only key.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            None
        } else {
            Some(Credential(key))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the key out of logs and panic messages.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// One request/response round trip against the remote API.
///
/// Implementations own authentication; callers only pass the method, a
/// path relative to the API root and an already-encoded JSON body.
/// `Sync` is required because the inventory listing issues two calls
/// from separate threads.
pub trait Transport: Sync {
    fn request(&self, method: Method, path: &str, body: Option<&str>) -> Result<Value, ApiError>;
}

/// Blocking reqwest client bound to one base URL. The credential is
/// baked into the default headers at construction.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for `base_url` with no request timeout. A trailing
    /// slash is ignored.
    pub fn new(base_url: &str, credential: Credential) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, credential, None)
    }

    /// Like [`ApiClient::new`], but each request gives up after `timeout`.
    /// `None` waits for as long as the server takes.
    pub fn with_timeout(
        base_url: &str,
        credential: Credential,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(credential.as_str())
            .context("API key contains characters not allowed in a header")?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Transport for ApiClient {
    fn request(&self, method: Method, path: &str, body: Option<&str>) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "sending request");

        let mut req = self.client.request(method.into(), &url);
        if let Some(body) = body {
            req = req
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let res = req.send().map_err(|source| ApiError::Network { source })?;
        let status = res.status();
        let text = res.text().map_err(|source| ApiError::Network { source })?;
        debug!(%method, %url, status = status.as_u16(), "received response");

        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Parse {
            reason: e.to_string(),
        })
    }
}

/// Pull `error.message` out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
