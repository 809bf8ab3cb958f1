//! # Scan Engine
//!
//! A deterministic URL threat scanning engine: canonicalizes a URL, probes
//! reachability, collects evidence (WHOIS/DNS/TLS/HTTP), then runs a set of
//! bounded-weight category analyzers alongside a threat-intelligence query
//! in parallel to produce an explainable [`orchestrator::ScanVerdict`].
//!
//! Every scan returns a verdict; individual collectors or analyzers degrade
//! to an empty/skipped result on failure rather than failing the scan.

pub mod analyzers;
pub mod cache;
pub mod canonical;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod events;
pub mod evidence;
pub mod intel;
pub mod orchestrator;
pub mod reachability;
pub mod stats;

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

pub use config::ScanEngineConfig;
pub use error::{Result, ScanError};
pub use orchestrator::{ScanOrchestrator, ScanRequest, ScanVerdict};

use cache::ScanResultCache;
use evidence::{CollectorBreakers, EvidenceCollectors};
use events::EventLog;
use intel::feed::JsonFeedFetcher;
use intel::sync::{SyncEngine, SyncRun, SyncTrigger};
use intel::{IndicatorStore, ThreatIntelEngine};
use stats::EngineStats;

/// Wires every component together from a single configuration object. This
/// is the top-level handle a consumer (the CLI or the service binary) holds
/// for the engine's lifetime.
pub struct ScanEngine {
    pub orchestrator: Arc<ScanOrchestrator>,
    pub store: Arc<IndicatorStore>,
    pub events: Arc<EventLog>,
    pub stats: Arc<EngineStats>,
    sync: Arc<SyncEngine>,
}

impl ScanEngine {
    pub fn new(config: ScanEngineConfig) -> Self {
        let store = Arc::new(IndicatorStore::new());
        let sources: Arc<DashMap<String, config::ThreatIntelSourceConfig>> = Arc::new(
            config.sources.iter().cloned().map(|s| (s.id.clone(), s)).collect(),
        );
        let intel = Arc::new(ThreatIntelEngine::new(store.clone(), sources, config.threat_intel.clone()));
        let collectors = Arc::new(EvidenceCollectors::new(Arc::new(CollectorBreakers::default())));
        let cache = Arc::new(ScanResultCache::new(config.threat_intel.cache_ttl));
        let stats = Arc::new(EngineStats::default());
        let events = Arc::new(EventLog::new(config.max_events_history));

        let fetcher = Arc::new(JsonFeedFetcher::new());
        let sync = Arc::new(SyncEngine::new(
            store.clone(),
            fetcher,
            config.sync.clone(),
            intel.clone(),
            cache.clone(),
        ));

        let orchestrator = Arc::new(ScanOrchestrator::new(config, collectors, intel, cache, stats.clone()));

        Self { orchestrator, store, events, stats, sync }
    }

    pub async fn scan(&self, url: &str) -> Result<ScanVerdict> {
        self.orchestrator.scan(ScanRequest::new(url)).await
    }

    /// Enroll every enabled, auto-sync source on its configured interval.
    /// Called once by a long-running host (`scan-engine-service`); a CLI
    /// invocation that only triggers one-off syncs never calls this.
    pub fn schedule_sync(&self) {
        self.sync.clone().schedule_all_sources(self.orchestrator.config().sources.clone());
    }

    /// `trigger_sync(source_id)`, one of the four §6 operational hooks.
    pub async fn trigger_sync(&self, source_id: &str, trigger: SyncTrigger) -> Result<SyncRun> {
        let source = self
            .orchestrator
            .config()
            .sources
            .iter()
            .find(|s| s.id == source_id)
            .cloned()
            .ok_or_else(|| ScanError::UnknownSource(source_id.to_string()))?;
        Ok(self.sync.run_sync(&source, trigger).await)
    }

    /// `evict_indicator(source_id, value_hash)`, one of the four §6
    /// operational hooks. Deactivates the indicator and invalidates any
    /// cached TI query / scan result referencing it. Returns whether a
    /// matching active indicator was found.
    pub fn evict_indicator(&self, source_id: &str, value_hash: &str) -> bool {
        let evicted = self.store.evict(source_id, value_hash);
        if evicted {
            let mut changed = HashSet::new();
            changed.insert(value_hash.to_string());
            self.orchestrator.intel().invalidate_cache_by_value_hashes(&changed);
            self.orchestrator.cache().invalidate_by_value_hashes(&changed);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn engine_always_returns_a_verdict_for_a_valid_url() {
        let engine = ScanEngine::new(ScanEngineConfig::default());
        let verdict = engine.scan("http://example.com/").await.unwrap();
        assert!(verdict.max_score > 0);
    }

    #[tokio::test]
    async fn engine_rejects_invalid_url() {
        let engine = ScanEngine::new(ScanEngineConfig::default());
        let err = engine.scan("not a url").await.unwrap_err();
        assert_eq!(err.kind(), error::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn engine_caches_repeat_scans() {
        let engine = ScanEngine::new(ScanEngineConfig::default());
        let first = engine.scan("http://example.com/cached").await.unwrap();
        let second = engine.scan("http://example.com/cached").await.unwrap();
        assert_eq!(first.canonical.fingerprint_hash, second.canonical.fingerprint_hash);
        assert_eq!(first.total_score, second.total_score);
    }
}
