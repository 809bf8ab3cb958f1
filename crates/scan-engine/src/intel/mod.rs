//! Threat-intelligence subsystem: indicator storage, query engine and
//! source synchronization.

pub mod feed;
pub mod store;
pub mod sync;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalUrl;
use crate::config::ThreatIntelConfig;

pub use store::IndicatorStore;

/// Entry capacity of the TI query cache; unrelated to TTL, which bounds how
/// long an entry stays valid regardless of how full the cache is.
const QUERY_CACHE_CAPACITY: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorType {
    Url,
    Domain,
    Ip,
    Hash,
    Email,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatIndicator {
    pub id: String,
    pub indicator_type: IndicatorType,
    pub value: String,
    pub value_hash: String,
    pub threat_type: String,
    pub severity: Severity,
    pub confidence: f64,
    pub source_id: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub metadata: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    Domain,
    Ip,
}

impl MatchStrategy {
    fn multiplier(self, cfg: &crate::config::StrategyMultipliers) -> f64 {
        match self {
            MatchStrategy::Exact => cfg.exact,
            MatchStrategy::Domain => cfg.domain,
            MatchStrategy::Ip => cfg.ip,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntelMatch {
    pub indicator: ThreatIndicator,
    pub strategy: MatchStrategy,
    pub source_reliability: f64,
    pub source_default_weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TiVerdict {
    Clean,
    Suspicious,
    Malicious,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct TiQueryResult {
    pub matches: Vec<IntelMatch>,
    pub score: u32,
    pub verdict: TiVerdict,
    pub cache_hit: bool,
}

/// Hash a canonicalized indicator value the same way stored indicators are
/// hashed, so lookups and upserts agree on the key.
pub fn value_hash(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.to_ascii_lowercase().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    use std::fmt::Write;
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[derive(Clone)]
struct CachedTiResult {
    result: TiQueryResult,
    inserted_at: Instant,
}

/// TTL'd cache of `TiQueryResult`s keyed by `"ti:" + fingerprint_hash`, per
/// §4.4. `quick_cache` gives us bounded-capacity eviction; the TTL on top is
/// the same `inserted_at.elapsed()` check `ScanResultCache` uses, since
/// `quick_cache` itself has no notion of expiry. A secondary reverse index
/// from `value_hash` to cache keys lets the sync engine invalidate targeted
/// entries instead of flushing the whole cache on every indicator change.
struct TiQueryCache {
    ttl: Duration,
    entries: quick_cache::sync::Cache<String, CachedTiResult>,
    by_value_hash: dashmap::DashMap<String, HashSet<String>>,
}

impl TiQueryCache {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: quick_cache::sync::Cache::new(QUERY_CACHE_CAPACITY),
            by_value_hash: dashmap::DashMap::new(),
        }
    }

    fn get(&self, key: &str) -> Option<TiQueryResult> {
        let cached = self.entries.get(key)?;
        if cached.inserted_at.elapsed() > self.ttl {
            self.entries.remove(key);
            return None;
        }
        Some(cached.result)
    }

    fn store(&self, key: &str, result: TiQueryResult) {
        for m in &result.matches {
            self.by_value_hash
                .entry(m.indicator.value_hash.clone())
                .or_default()
                .insert(key.to_string());
        }
        self.entries.insert(key.to_string(), CachedTiResult { result, inserted_at: Instant::now() });
    }

    /// Called by the sync engine after a batch upsert touches these hashes.
    fn invalidate_by_value_hashes(&self, changed: &HashSet<String>) {
        for hash in changed {
            if let Some((_, keys)) = self.by_value_hash.remove(hash) {
                for key in keys {
                    self.entries.remove(&key);
                }
            }
        }
    }
}

/// Sources are looked up by id to retrieve `default_weight`/`reliability`
/// when scoring a match; the engine keeps this map in memory, refreshed by
/// the sync scheduler whenever source configuration changes.
pub struct ThreatIntelEngine {
    store: Arc<IndicatorStore>,
    sources: Arc<dashmap::DashMap<String, crate::config::ThreatIntelSourceConfig>>,
    config: ThreatIntelConfig,
    query_cache: TiQueryCache,
}

impl ThreatIntelEngine {
    pub fn new(
        store: Arc<IndicatorStore>,
        sources: Arc<dashmap::DashMap<String, crate::config::ThreatIntelSourceConfig>>,
        config: ThreatIntelConfig,
    ) -> Self {
        let query_cache = TiQueryCache::new(config.cache_ttl);
        Self { store, sources, config, query_cache }
    }

    /// Invalidate cached query results whose matches reference any of the
    /// given indicator value hashes. Driven by the sync engine's upserts.
    pub fn invalidate_cache_by_value_hashes(&self, changed: &HashSet<String>) {
        self.query_cache.invalidate_by_value_hashes(changed);
    }

    /// Run the exact/domain/IP strategies concurrently and aggregate their
    /// matches into a capped, weighted score. Cached under `"ti:" +
    /// fingerprint_hash` for `cache_ttl`; `bypass_cache` skips both the read
    /// and the write, for callers that need a guaranteed-fresh lookup.
    pub async fn query(
        &self,
        canonical: &CanonicalUrl,
        resolved_ip: Option<std::net::IpAddr>,
        bypass_cache: bool,
    ) -> TiQueryResult {
        let cache_key = format!("ti:{}", canonical.fingerprint_hash);
        if !bypass_cache {
            if let Some(mut cached) = self.query_cache.get(&cache_key) {
                cached.cache_hit = true;
                return cached;
            }
        }

        let url_hash = value_hash(&canonical.as_url_string());
        let domain_hash = value_hash(&canonical.registrable_domain);
        let ip_hash = resolved_ip.map(|ip| value_hash(&ip.to_string()));

        let (url_matches, domain_matches, ip_matches) = tokio::join!(
            self.lookup(IndicatorType::Url, &url_hash, MatchStrategy::Exact),
            self.lookup(IndicatorType::Domain, &domain_hash, MatchStrategy::Domain),
            self.lookup_optional(IndicatorType::Ip, ip_hash.as_deref(), MatchStrategy::Ip),
        );

        let mut matches = Vec::new();
        matches.extend(url_matches);
        matches.extend(domain_matches);
        matches.extend(ip_matches);

        let raw_score: f64 = matches.iter().map(|m| m.contribution).sum();
        let score = raw_score.min(self.config.max_weight as f64).round() as u32;

        let verdict = if matches.is_empty() {
            TiVerdict::Clean
        } else if raw_score >= self.config.malicious_threshold {
            TiVerdict::Malicious
        } else if raw_score >= self.config.suspicious_threshold {
            TiVerdict::Suspicious
        } else {
            TiVerdict::Unknown
        };

        let result = TiQueryResult { matches, score, verdict, cache_hit: false };
        if !bypass_cache {
            self.query_cache.store(&cache_key, result.clone());
        }
        result
    }

    async fn lookup(&self, kind: IndicatorType, hash: &str, strategy: MatchStrategy) -> Vec<IntelMatch> {
        self.store
            .lookup(kind, hash)
            .into_iter()
            .filter_map(|indicator| self.score_match(indicator, strategy))
            .collect()
    }

    async fn lookup_optional(
        &self,
        kind: IndicatorType,
        hash: Option<&str>,
        strategy: MatchStrategy,
    ) -> Vec<IntelMatch> {
        match hash {
            Some(h) => self.lookup(kind, h, strategy).await,
            None => Vec::new(),
        }
    }

    fn score_match(&self, indicator: ThreatIndicator, strategy: MatchStrategy) -> Option<IntelMatch> {
        let source = self.sources.get(&indicator.source_id)?;
        let multiplier = strategy.multiplier(&self.config.strategy_multipliers);
        let contribution =
            source.default_weight * multiplier * source.reliability * (indicator.confidence / 100.0);
        Some(IntelMatch {
            source_reliability: source.reliability,
            source_default_weight: source.default_weight,
            strategy,
            contribution,
            indicator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_hash_is_case_insensitive() {
        assert_eq!(value_hash("Example.COM"), value_hash("example.com"));
    }

    #[test]
    fn value_hash_is_deterministic() {
        assert_eq!(value_hash("evil.example"), value_hash("evil.example"));
    }
}
