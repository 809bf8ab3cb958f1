//! Indicator Store: a concurrent, hash-indexed table of threat indicators.
//!
//! Generalizes the per-type `HashMap` cache the engine used to keep inline
//! into a sharded concurrent map sized for a few hundred thousand rows with
//! sub-millisecond lookups, using `dashmap` the way the rest of the
//! workspace's clustering/alerting crates already do for hot shared state.

use chrono::Utc;
use dashmap::DashMap;

use super::{IndicatorType, ThreatIndicator};

/// Primary key: `(type, value_hash, source_id)`, unique by construction
/// since it is also the map key.
type PrimaryKey = (IndicatorType, String, String);
/// Secondary index key: `(type, value_hash)` -> source ids currently holding
/// an active indicator for that value.
type SecondaryKey = (IndicatorType, String);

#[derive(Default)]
pub struct IndicatorStore {
    primary: DashMap<PrimaryKey, ThreatIndicator>,
    by_value: DashMap<SecondaryKey, Vec<String>>,
    by_source: DashMap<String, Vec<PrimaryKey>>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UpsertCounts {
    pub added: u64,
    pub updated: u64,
}

impl IndicatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a batch of indicators for one source, keyed by `(type,
    /// value_hash, source_id)`. Idempotent: re-running the same batch
    /// produces zero additions and `batch.len()` updates.
    pub fn upsert_batch(&self, source_id: &str, indicators: Vec<ThreatIndicator>) -> UpsertCounts {
        let mut counts = UpsertCounts::default();
        for indicator in indicators {
            let key = (indicator.indicator_type, indicator.value_hash.clone(), source_id.to_string());
            let secondary = (indicator.indicator_type, indicator.value_hash.clone());

            let is_new = !self.primary.contains_key(&key);
            self.primary.insert(key.clone(), indicator);

            if is_new {
                counts.added += 1;
                self.by_value.entry(secondary).or_default().push(source_id.to_string());
                self.by_source.entry(source_id.to_string()).or_default().push(key);
            } else {
                counts.updated += 1;
            }
        }
        counts
    }

    /// Active, unexpired indicators matching a type/value-hash pair across
    /// all sources.
    pub fn lookup(&self, indicator_type: IndicatorType, value_hash: &str) -> Vec<ThreatIndicator> {
        let now = Utc::now();
        let Some(source_ids) = self.by_value.get(&(indicator_type, value_hash.to_string())) else {
            return Vec::new();
        };

        source_ids
            .iter()
            .filter_map(|source_id| {
                self.primary.get(&(indicator_type, value_hash.to_string(), source_id.clone()))
            })
            .filter(|entry| entry.active && entry.expires_at.map(|exp| exp > now).unwrap_or(true))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Mark indicators from a source whose `expires_at` has passed as
    /// inactive, returning how many were newly expired.
    pub fn expire_source(&self, source_id: &str, now: chrono::DateTime<Utc>) -> u64 {
        let Some(keys) = self.by_source.get(source_id) else {
            return 0;
        };
        let mut expired = 0;
        for key in keys.iter() {
            if let Some(mut entry) = self.primary.get_mut(key) {
                if entry.active && entry.expires_at.map(|exp| exp <= now).unwrap_or(false) {
                    entry.active = false;
                    expired += 1;
                }
            }
        }
        expired
    }

    /// `evict_indicator(source_id, value_hash)`: deactivate every indicator
    /// from `source_id` matching `value_hash`, regardless of type. Returns
    /// whether an active indicator was found and deactivated.
    pub fn evict(&self, source_id: &str, value_hash: &str) -> bool {
        let Some(keys) = self.by_source.get(source_id) else {
            return false;
        };
        let mut evicted = false;
        for key in keys.iter().filter(|k| k.1 == value_hash) {
            if let Some(mut entry) = self.primary.get_mut(key) {
                if entry.active {
                    entry.active = false;
                    evicted = true;
                }
            }
        }
        evicted
    }

    pub fn active_count(&self) -> usize {
        self.primary.iter().filter(|e| e.active).count()
    }

    pub fn total_count(&self) -> usize {
        self.primary.len()
    }
}
