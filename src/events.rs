//! Attribution notifications.
//!
//! The session layer calls every registered observer synchronously from the
//! affiliate write path. The default observer emits one structured JSON line
//! per event via `tracing`, on target `affcd_events`. Emitting never panics.

use serde_json::json;
use std::sync::Arc;

use crate::types::AffiliateAttribution;

/// Something that happened to a session's affiliate attribution.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributionEvent {
    Set {
        session_id: String,
        attribution: AffiliateAttribution,
    },
    Cleared {
        session_id: String,
        previous_code: Option<String>,
    },
}

impl AttributionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AttributionEvent::Set { .. } => "affiliate_attribution_set",
            AttributionEvent::Cleared { .. } => "affiliate_attribution_cleared",
        }
    }
}

pub trait AttributionObserver: Send + Sync {
    fn notify(&self, event: &AttributionEvent);
}

/// Ordered list of observers, cheap to clone into every request's store.
#[derive(Clone, Default)]
pub struct Observers(Vec<Arc<dyn AttributionObserver>>);

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn AttributionObserver>) -> Self {
        self.0.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn notify(&self, event: &AttributionEvent) {
        for observer in &self.0 {
            observer.notify(event);
        }
    }
}

/// Writes each event to the log as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AttributionObserver for TracingObserver {
    fn notify(&self, event: &AttributionEvent) {
        emit(&event_json(event));
    }
}

fn event_json(event: &AttributionEvent) -> serde_json::Value {
    let mut body = json!({
        "event": event.name(),
        "product": {
            "name": "affcd-satellite",
            "version": env!("CARGO_PKG_VERSION"),
        },
    });

    match event {
        AttributionEvent::Set {
            session_id,
            attribution,
        } => {
            body["session"] = json!(crate::session::short_id(session_id));
            body["affiliate_code"] = json!(attribution.code);
            body["time"] = json!(attribution.timestamp);
            body["landing_page"] = json!(attribution.landing_page);
        }
        AttributionEvent::Cleared {
            session_id,
            previous_code,
        } => {
            body["session"] = json!(crate::session::short_id(session_id));
            body["previous_code"] = json!(previous_code);
        }
    }
    body
}

fn emit(event: &serde_json::Value) {
    if let Ok(json) = serde_json::to_string(event) {
        tracing::info!(target: "affcd_events", "{}", json);
    }
}
