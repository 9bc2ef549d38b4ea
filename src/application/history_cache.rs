// History cache - Read-modify-write access to per-vehicle position history
use crate::application::history_store::HistoryStore;
use crate::domain::error::SenseError;
use crate::domain::history::HistoryRecord;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct HistoryCache {
    store: Arc<dyn HistoryStore>,
    history_size: usize,
    timeout: Duration,
}

impl HistoryCache {
    pub fn new(store: Arc<dyn HistoryStore>, history_size: usize, timeout: Duration) -> Self {
        Self {
            store,
            history_size,
            timeout,
        }
    }

    pub fn history_size(&self) -> usize {
        self.history_size
    }

    /// Loads the history of a vehicle. Never fails: a missing, unreadable or
    /// corrupt record yields a fresh empty one.
    pub async fn load(&self, vehicle_id: &str) -> HistoryRecord {
        match self.read(vehicle_id).await {
            Ok(Some(record)) => record,
            Ok(None) => HistoryRecord::new(),
            Err(e) => {
                tracing::warn!(vehicle_id, error = %e, "starting with empty history");
                HistoryRecord::new()
            }
        }
    }

    async fn read(&self, vehicle_id: &str) -> Result<Option<HistoryRecord>, SenseError> {
        let stored = tokio::time::timeout(self.timeout, self.store.get(vehicle_id))
            .await
            .map_err(|_| self.timeout_error(vehicle_id))?
            .map_err(|source| SenseError::CacheRead {
                vehicle_id: vehicle_id.to_string(),
                source,
            })?;

        let Some(bytes) = stored else {
            return Ok(None);
        };

        HistoryRecord::from_json(&bytes)
            .map(Some)
            .map_err(|e| SenseError::CacheRead {
                vehicle_id: vehicle_id.to_string(),
                source: e.into(),
            })
    }

    /// Persists the history of a vehicle, overwriting what was stored.
    pub async fn save(&self, vehicle_id: &str, record: &HistoryRecord) -> Result<(), SenseError> {
        let payload = record.to_json().map_err(|e| SenseError::CacheWrite {
            vehicle_id: vehicle_id.to_string(),
            source: e.into(),
        })?;

        tokio::time::timeout(self.timeout, self.store.put(vehicle_id, Bytes::from(payload)))
            .await
            .map_err(|_| self.timeout_error(vehicle_id))?
            .map_err(|source| SenseError::CacheWrite {
                vehicle_id: vehicle_id.to_string(),
                source,
            })
    }

    fn timeout_error(&self, vehicle_id: &str) -> SenseError {
        SenseError::Timeout {
            vehicle_id: vehicle_id.to_string(),
            millis: self.timeout.as_millis() as u64,
        }
    }
}
