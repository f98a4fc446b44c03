//! Most-recent-first log of combined generation records, persisted in full on every change.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{models::HistoryRecord, storage::KeyValueStore};

pub const HISTORY_KEY: &str = "generationHistory";

pub struct HistoryStore {
    backend: Arc<dyn KeyValueStore>,
    records: Vec<HistoryRecord>,
}

impl HistoryStore {
    /// Reads persisted history. Absent, unreadable or corrupt state all yield an empty log.
    pub fn load(backend: Arc<dyn KeyValueStore>) -> Self {
        let records = match backend.get(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryRecord>>(&raw) {
                Ok(records) => records,
                Err(e) => {
                    warn!("⚠️ Persisted history is corrupt, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("⚠️ Failed to read history, starting empty: {}", e);
                Vec::new()
            }
        };
        info!("📚 Loaded {} history records", records.len());
        Self { backend, records }
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn append(&mut self, record: HistoryRecord) {
        info!("📝 Saving history record {}", record.id);
        self.records.insert(0, record);
        self.persist();
    }

    pub fn clear(&mut self) {
        info!("🧹 Clearing {} history records", self.records.len());
        self.records.clear();
        self.persist();
    }

    pub fn find_by_id(&self, id: &str) -> Option<&HistoryRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    // The in-memory log stays authoritative for this process when a write fails.
    fn persist(&self) {
        let serialized = match serde_json::to_string(&self.records) {
            Ok(s) => s,
            Err(e) => {
                error!("❌ Failed to serialize history: {}", e);
                return;
            }
        };
        if let Err(e) = self.backend.set(HISTORY_KEY, &serialized) {
            error!("❌ Failed to save history: {}", e);
        }
    }
}
