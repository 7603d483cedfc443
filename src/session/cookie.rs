//! Session identifier issuance and the session cookie wire format.
//!
//! Identifiers are 32 alphanumeric characters drawn from the thread-local
//! CSPRNG. Anything else arriving in the cookie is treated as absent.

use rand::Rng;
use rand::distributions::Alphanumeric;

use super::SessionConfig;

/// Fixed part of the cookie name; the session-scope suffix follows it.
pub const COOKIE_PREFIX: &str = "affcd_session_";

/// Length of a session identifier.
pub const SESSION_ID_LEN: usize = 32;

/// Generate a fresh session identifier.
pub fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

/// Whether a client-supplied value is a syntactically valid identifier.
pub fn is_valid_session_id(value: &str) -> bool {
    value.len() == SESSION_ID_LEN && value.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// `Set-Cookie` value establishing `session_id` on the client.
pub fn make_set_cookie(config: &SessionConfig, session_id: &str, secure: bool) -> String {
    let mut parts = vec![
        format!("{}={}", config.cookie_name(), session_id),
        format!("Max-Age={}", config.ttl_secs),
    ];
    push_scope(&mut parts, config, secure);
    parts.join("; ")
}

/// `Set-Cookie` value that makes the browser evict the session cookie.
pub fn make_delete_cookie(config: &SessionConfig, secure: bool) -> String {
    let mut parts = vec![
        format!("{}=", config.cookie_name()),
        "Max-Age=0".into(),
        "Expires=Thu, 01 Jan 1970 00:00:00 GMT".into(),
    ];
    push_scope(&mut parts, config, secure);
    parts.join("; ")
}

fn push_scope(parts: &mut Vec<String>, config: &SessionConfig, secure: bool) {
    parts.push(format!("Path={}", config.cookie_path));
    if let Some(domain) = &config.cookie_domain {
        parts.push(format!("Domain={domain}"));
    }
    parts.push("HttpOnly".into());
    parts.push("SameSite=Lax".into());
    if secure {
        parts.push("Secure".into());
    }
}

/// Parse a specific cookie from a Cookie header value.
pub fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some(value) = trimmed.strip_prefix(name)
            && let Some(value) = value.strip_prefix('=')
        {
            return Some(value);
        }
    }
    None
}
