//! Request descriptors and the HTTP transport.
//!
//! The client builds a [`Request`] as plain data and hands it to a
//! [`Transport`]. [`HttpTransport`] performs the blocking GET with reqwest;
//! tests substitute their own implementation.

use bbkit_core::{Error, Result};
use tracing::debug;

/// HTTP method for a request. The API surface is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// GET request for `url` with no headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value, ignoring case of the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Executes requests and returns the raw response body.
///
/// Implementations report connection problems as [`Error::Http`] and
/// non-success statuses as [`Error::Api`].
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn execute(&self, request: &Request) -> Result<String>;
}

/// Blocking reqwest transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a transport with reqwest's default settings.
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &Request) -> Result<String> {
        debug!(url = request.url.as_str(), "Bitbucket GET request");

        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().unwrap_or_default();
            debug!(
                status = status_code,
                url = request.url.as_str(),
                "Bitbucket API error response"
            );
            return Err(Error::from_status(status_code, message));
        }

        response
            .text()
            .map_err(|e| Error::Http(format!("Failed to read response body: {}", e)))
    }
}
