//! Explicit per-request inputs to session resolution.
//!
//! Everything the session layer needs to know about the inbound request is
//! captured here once, so the store never reaches for ambient HTTP state.

use axum::http::{HeaderMap, Uri, header};
use std::net::SocketAddr;

use super::cookie::parse_cookie;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Raw `Cookie` header, empty when absent.
    pub cookie_header: String,
    pub ip_address: String,
    pub user_agent: String,
    /// Whether the client connection is encrypted (directly or at the edge).
    pub is_secure: bool,
    pub referrer: Option<String>,
    /// Request path plus query, used as the landing page of an attribution.
    pub path: String,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the request's headers and peer address.
    ///
    /// The client IP is the right-most `X-Forwarded-For` hop (the one our own
    /// proxy appended; earlier hops are client-supplied), then `X-Real-IP`,
    /// then the socket peer.
    pub fn from_request(headers: &HeaderMap, uri: &Uri, peer: Option<SocketAddr>) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let ip_address = header_str("x-forwarded-for")
            .and_then(|v| v.rsplit(',').map(str::trim).find(|hop| !hop.is_empty()))
            .or_else(|| header_str("x-real-ip"))
            .map(String::from)
            .or_else(|| peer.map(|p| p.ip().to_string()))
            .unwrap_or_default();

        let is_secure = uri.scheme_str() == Some("https")
            || header_str("x-forwarded-proto").is_some_and(|p| p.eq_ignore_ascii_case("https"));

        Self {
            cookie_header: header_str(header::COOKIE.as_str())
                .unwrap_or_default()
                .to_string(),
            ip_address,
            user_agent: header_str(header::USER_AGENT.as_str())
                .unwrap_or_default()
                .to_string(),
            is_secure,
            referrer: header_str(header::REFERER.as_str()).map(String::from),
            path: uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| uri.path().to_string()),
        }
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        if !self.cookie_header.is_empty() {
            self.cookie_header.push_str("; ");
        }
        self.cookie_header.push_str(&format!("{name}={value}"));
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_ip(mut self, ip_address: &str) -> Self {
        self.ip_address = ip_address.into();
        self
    }

    pub fn with_secure(mut self, is_secure: bool) -> Self {
        self.is_secure = is_secure;
        self
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        parse_cookie(&self.cookie_header, name)
    }
}
