//! Application configuration via environment variables.
//!
//! The host platform owns the settings store; this process only sees the
//! values it exports into the environment.

use std::env;
use std::time::Duration;

use crate::session::SessionConfig;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub site_id: String,
    pub site_secret: String,
    pub master_url: String,
    pub session_ttl_secs: i64,
    pub cookie_suffix: String,
    pub cookie_path: String,
    pub cookie_domain: Option<String>,
    pub check_ip: bool,
    pub check_user_agent: bool,
    pub session_backend: String,
    pub dynamodb_table: String,
    pub dynamodb_endpoint: String,
    pub reap_interval_secs: u64,
    pub post_timeout_secs: u64,
    pub get_timeout_secs: u64,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required: `AFFCD_SITE_ID`. A missing `AFFCD_SITE_SECRET` is tolerated
    /// but every signature produced with it will fail verification upstream.
    pub fn from_env() -> Result<Self, ConfigError> {
        let site_id = required_env("AFFCD_SITE_ID")?;
        let site_secret = env::var("AFFCD_SITE_SECRET").unwrap_or_default();
        if site_secret.is_empty() {
            tracing::warn!("AFFCD_SITE_SECRET is empty; signed requests will not verify on the master");
        }

        Ok(Self {
            cookie_suffix: env::var("SESSION_COOKIE_SUFFIX").unwrap_or_else(|_| site_id.clone()),
            site_id,
            site_secret,
            master_url: env::var("AFFCD_MASTER_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            session_ttl_secs: parsed_env("SESSION_TTL_SECS", 86_400),
            cookie_path: env::var("COOKIE_PATH").unwrap_or_else(|_| "/".into()),
            cookie_domain: env::var("COOKIE_DOMAIN").ok().filter(|d| !d.is_empty()),
            check_ip: bool_env("SESSION_CHECK_IP", false),
            check_user_agent: bool_env("SESSION_CHECK_USER_AGENT", true),
            session_backend: env::var("SESSION_BACKEND").unwrap_or_else(|_| "memory".into()),
            dynamodb_table: env::var("DYNAMODB_TABLE")
                .unwrap_or_else(|_| "affcd_sessions".into()),
            dynamodb_endpoint: env::var("DYNAMODB_ENDPOINT").unwrap_or_default(),
            reap_interval_secs: parsed_env("SESSION_REAP_INTERVAL_SECS", 3600),
            post_timeout_secs: parsed_env("SIGNER_POST_TIMEOUT_SECS", 20),
            get_timeout_secs: parsed_env("SIGNER_GET_TIMEOUT_SECS", 15),
            port: parsed_env("PORT", 3002),
        })
    }

    /// Session policy derived from the loaded settings.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            ttl_secs: self.session_ttl_secs,
            cookie_suffix: self.cookie_suffix.clone(),
            cookie_path: self.cookie_path.clone(),
            cookie_domain: self.cookie_domain.clone(),
            check_ip: self.check_ip,
            check_user_agent: self.check_user_agent,
        }
    }

    /// Master endpoint receiving conversion events.
    pub fn conversions_url(&self) -> String {
        format!("{}/api/v1/conversions", self.master_url.trim_end_matches('/'))
    }

    pub fn post_timeout(&self) -> Duration {
        Duration::from_secs(self.post_timeout_secs)
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_secs(self.get_timeout_secs)
    }
}

/// Configuration for testing — all fields settable directly.
impl Config {
    pub fn test_default() -> Self {
        Self {
            site_id: "site-test".into(),
            site_secret: "test-shared-secret".into(),
            master_url: "http://localhost:8080".into(),
            session_ttl_secs: 86_400,
            cookie_suffix: "site-test".into(),
            cookie_path: "/".into(),
            cookie_domain: None,
            check_ip: false,
            check_user_agent: true,
            session_backend: "memory".into(),
            dynamodb_table: "affcd_sessions".into(),
            dynamodb_endpoint: String::new(),
            reap_interval_secs: 3600,
            post_timeout_secs: 20,
            get_timeout_secs: 15,
            port: 3002,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(String),
}

fn required_env(key: &str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnv(key.into()))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.as_str(), "true" | "1" | "True" | "yes"))
        .unwrap_or(default)
}
