//! Resilient request client
//!
//! Wraps a `reqwest::Client` and runs every request through
//! [`with_retry`](super::retry::with_retry). A non-2xx status is treated as a
//! failure and counts against the attempt budget like a transport error.

use crate::config::HttpConfig;
use crate::http::retry::{with_retry, RetryPolicy};
use crate::http::NetworkError;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Longest response body kept in an error message
const ERROR_BODY_LIMIT: usize = 500;

/// A successful (2xx) response with its body fully read
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub body: String,
}

impl HttpResponse {
    /// Decodes the body as JSON into a typed record
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Builds an HTTP client from the configured user agent and timeouts
pub fn build_http_client(config: &HttpConfig) -> Result<Client, NetworkError> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(NetworkError::Client)
}

/// HTTP client that retries transient failures with exponential backoff
///
/// Cheap to clone; the listing, detail and extraction clients share one
/// connection pool.
#[derive(Debug, Clone)]
pub struct RequestClient {
    http: Client,
    policy: RetryPolicy,
}

impl RequestClient {
    pub fn new(http: Client, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    /// Builds the underlying client from config
    pub fn from_config(http: &HttpConfig, policy: RetryPolicy) -> Result<Self, NetworkError> {
        Ok(Self::new(build_http_client(http)?, policy))
    }

    /// Sends a request, retrying until it succeeds or attempts run out
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `url` - Fully built URL, query string included
    /// * `headers` - Extra headers for this request
    /// * `body` - Optional JSON body
    ///
    /// # Returns
    ///
    /// * `Ok(HttpResponse)` - A 2xx response
    /// * `Err(NetworkError)` - The final attempt's error
    pub async fn send(
        &self,
        method: Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&serde_json::Value>,
    ) -> Result<HttpResponse, NetworkError> {
        let label = format!("{} {}", method, redact_query(url));
        with_retry(self.policy, &label, move |_| {
            self.send_once(method.clone(), url, headers, body)
        })
        .await
    }

    /// A single attempt: send, read the body, check the status
    async fn send_once(
        &self,
        method: Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&serde_json::Value>,
    ) -> Result<HttpResponse, NetworkError> {
        let mut request = self
            .http
            .request(method, url.clone())
            .headers(headers.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let transport = |source: reqwest::Error| NetworkError::Transport {
            url: redact_query(url),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(NetworkError::Status {
                url: redact_query(url),
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        tracing::trace!("{} answered {}", redact_query(url), status);
        Ok(HttpResponse { body: text })
    }
}

/// URL without its query string, for log lines and errors
fn redact_query(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

fn truncate_body(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
