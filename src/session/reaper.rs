//! Periodic reclamation of expired session records.
//!
//! Only records strictly past their deadline are deleted. The deadline is
//! re-checked by the backend at delete time, so a record refreshed after it
//! was read here survives.

use std::sync::Arc;
use std::time::Duration;

use super::store::SessionLayer;
use super::{Clock, RECORD_KEY_PREFIX, SessionBackend, StoreError};

/// Delete every expired record. Idempotent.
pub async fn reap_expired<B: SessionBackend>(backend: &B, clock: &dyn Clock) -> Result<usize, StoreError> {
    let keys = backend.keys(RECORD_KEY_PREFIX).await?;
    let now = clock.now();
    let mut reaped = 0;

    for key in keys {
        match backend.load(&key).await {
            Ok(Some(record)) if record.is_expired(now) => {
                if backend.delete_expired(&key, now).await? {
                    reaped += 1;
                }
            }
            Ok(_) => {}
            Err(StoreError::Serialization(e)) => {
                tracing::warn!(key = %key, error = %e, "unreadable session record, deleting");
                backend.delete(&key).await?;
                reaped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(reaped)
}

/// Run `reap_expired` every `every` until the runtime shuts down.
pub fn spawn_reaper<B: SessionBackend + 'static>(
    layer: Arc<SessionLayer<B>>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately; skip it so startup stays quiet.
        interval.tick().await;
        loop {
            interval.tick().await;
            match layer.reap_expired().await {
                Ok(0) => tracing::debug!("session reaper: nothing to reclaim"),
                Ok(n) => tracing::info!(reaped = n, "session reaper reclaimed expired sessions"),
                Err(e) => tracing::error!("session reaper failed: {}", e),
            }
        }
    })
}
