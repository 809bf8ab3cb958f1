//! Bounded in-memory audit log of scan/sync events, independent of the
//! per-scan verdict. Operational visibility only, not the system of record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub id: String,
    pub description: String,
    pub fingerprint: String,
    pub risk_level: String,
    pub timestamp: DateTime<Utc>,
}

pub struct EventLog {
    max_history: usize,
    events: Arc<RwLock<Vec<ScanEvent>>>,
}

impl EventLog {
    pub fn new(max_history: usize) -> Self {
        Self { max_history, events: Arc::new(RwLock::new(Vec::new())) }
    }

    pub async fn record(&self, fingerprint: &str, risk_level: &str, description: impl Into<String>) {
        let event = ScanEvent {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            fingerprint: fingerprint.to_string(),
            risk_level: risk_level.to_string(),
            timestamp: Utc::now(),
        };
        info!(fingerprint, risk_level, "{}", event.description);

        let mut events = self.events.write().await;
        events.push(event);
        if events.len() > self.max_history {
            let excess = events.len() - self.max_history;
            events.drain(0..excess);
        }
    }

    pub async fn recent(&self, limit: usize) -> Vec<ScanEvent> {
        let events = self.events.read().await;
        events.iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn truncates_to_max_history() {
        let log = EventLog::new(2);
        log.record("fp1", "A", "first").await;
        log.record("fp2", "B", "second").await;
        log.record("fp3", "C", "third").await;

        let recent = log.recent(10).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].fingerprint, "fp3");
    }
}
