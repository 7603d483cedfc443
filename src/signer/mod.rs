//! Signed HTTP calls from this satellite to the master service.
//!
//! Every call is single-attempt and bounded by a timeout. Transport failures
//! never escape as errors: they come back as a `SignedResponse` with status
//! code 0 and the error text as the body, so callers branch once.

pub mod canonical;

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
pub use canonical::{build_headers, canonicalize, sign};

/// Version of the envelope every signed payload carries.
pub const SCHEMA_VERSION: &str = "1";

pub const DEFAULT_POST_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_GET_TIMEOUT: Duration = Duration::from_secs(15);

/// Uniform outcome of a signed call.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedResponse {
    /// HTTP status, or 0 when the request never completed.
    pub status_code: u16,
    /// Response body, or the transport error text when `status_code` is 0.
    pub body: String,
    pub error: Option<String>,
}

impl SignedResponse {
    fn transport_error(message: String) -> Self {
        Self {
            status_code: 0,
            body: message.clone(),
            error: Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Parse the body as JSON, when it is JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    /// Extra headers. Names colliding with the signed header set are ignored.
    pub headers: Vec<(String, String)>,
}

/// Signs and sends requests on behalf of one site.
#[derive(Clone)]
pub struct Signer {
    client: reqwest::Client,
    site_id: String,
    secret: String,
    post_timeout: Duration,
    get_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl Signer {
    pub fn new(client: reqwest::Client, site_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client,
            site_id: site_id.into(),
            secret: secret.into(),
            post_timeout: DEFAULT_POST_TIMEOUT,
            get_timeout: DEFAULT_GET_TIMEOUT,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        Self::new(client, &config.site_id, &config.site_secret)
            .with_timeouts(config.post_timeout(), config.get_timeout())
    }

    pub fn with_timeouts(mut self, post: Duration, get: Duration) -> Self {
        self.post_timeout = post;
        self.get_timeout = get;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// Caller payload plus the mandatory `schema_version` and `site_id`.
    /// Envelope fields win over caller fields of the same name.
    pub fn envelope(&self, payload: Map<String, Value>) -> Map<String, Value> {
        let mut body = payload;
        body.insert("schema_version".into(), Value::from(SCHEMA_VERSION));
        body.insert("site_id".into(), Value::from(self.site_id.as_str()));
        body
    }

    /// POST the enveloped, canonicalized and signed `payload` to `url`.
    pub async fn post_json(
        &self,
        url: &str,
        payload: Map<String, Value>,
        options: RequestOptions,
    ) -> SignedResponse {
        let body = canonicalize(&self.envelope(payload));
        let request = self.client.post(url).body(body.clone());
        let timeout = options.timeout.unwrap_or(self.post_timeout);
        self.send("POST", url, request, &body, timeout, &options).await
    }

    /// GET `url` with `query`. The signature covers an empty body, so query
    /// parameters are not protected by it.
    pub async fn get_signed(
        &self,
        url: &str,
        query: &[(&str, &str)],
        options: RequestOptions,
    ) -> SignedResponse {
        let request = self.client.get(url).query(query);
        let timeout = options.timeout.unwrap_or(self.get_timeout);
        self.send("GET", url, request, b"", timeout, &options).await
    }

    async fn send(
        &self,
        method: &str,
        url: &str,
        mut request: reqwest::RequestBuilder,
        body: &[u8],
        timeout: Duration,
        options: &RequestOptions,
    ) -> SignedResponse {
        let signed = build_headers(body, &self.site_id, self.secret.as_bytes(), self.clock.now());

        for (name, value) in &options.headers {
            if !signed.keys().any(|k| k.eq_ignore_ascii_case(name)) {
                request = request.header(name.as_str(), value.as_str());
            }
        }
        for (name, value) in &signed {
            request = request.header(*name, value.as_str());
        }

        tracing::debug!(method, url, "sending signed request");
        let response = match request.timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(method, url, error = %e, "signed request failed in transport");
                return SignedResponse::transport_error(e.to_string());
            }
        };

        let status_code = response.status().as_u16();
        match response.text().await {
            Ok(body) => {
                tracing::info!(method, url, status = status_code, "signed request completed");
                SignedResponse {
                    status_code,
                    body,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(method, url, error = %e, "failed to read signed response body");
                SignedResponse::transport_error(e.to_string())
            }
        }
    }
}
