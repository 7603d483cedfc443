//! Shared request/response DTOs and the typed shapes stored inside the
//! session's key/value bag.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Affiliate attribution captured for a visitor (`data.affiliate_data`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffiliateAttribution {
    pub code: String,
    /// Unix seconds at capture.
    pub timestamp: i64,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub landing_page: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub ip_address: String,
    /// Caller-supplied source fields (campaign, medium, ...), kept apart from
    /// the captured fields so they can never shadow them.
    #[serde(default)]
    pub source: Map<String, Value>,
}

/// One entry of `data.form_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDraft {
    pub data: Value,
    pub timestamp: i64,
}

/// One entry of `data.flash_messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub timestamp: i64,
}

/// GET /health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub site_id: String,
    pub backend: String,
}

/// GET /track response.
#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub affiliate_code: String,
}

/// GET /session response.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: Option<String>,
    pub affiliate_code: Option<String>,
    pub cart_count: usize,
    pub flash: Vec<FlashMessage>,
}

/// Cart mutation responses.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: Vec<Value>,
}

/// POST /conversion request body.
#[derive(Debug, Deserialize)]
pub struct ConversionRequest {
    pub order_id: String,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Anything else the host wants forwarded to the master.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_currency() -> String {
    "USD".into()
}

/// POST /conversion response.
#[derive(Debug, Serialize)]
pub struct ConversionResponse {
    pub tracked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /session/regenerate response.
#[derive(Debug, Serialize)]
pub struct RegenerateResponse {
    pub session_id: String,
}

/// Generic success response.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}
