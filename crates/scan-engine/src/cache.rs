//! Scan result cache with singleflight: at most one in-flight scan per
//! fingerprint, and a TTL'd verdict cache keyed by the same fingerprint.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::orchestrator::ScanVerdict;

struct CacheEntry {
    verdict: ScanVerdict,
    inserted_at: std::time::Instant,
    /// value_hashes referenced by this verdict's TI matches, used to target
    /// invalidation when the sync engine reports a changed indicator.
    matched_hashes: HashSet<String>,
}

pub struct ScanResultCache {
    ttl: Duration,
    entries: DashMap<String, CacheEntry>,
    in_flight: DashMap<String, Arc<OnceCell<ScanVerdict>>>,
}

impl ScanResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: DashMap::new(), in_flight: DashMap::new() }
    }

    pub fn get(&self, fingerprint: &str) -> Option<ScanVerdict> {
        let entry = self.entries.get(fingerprint)?;
        if entry.inserted_at.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(fingerprint);
            return None;
        }
        Some(entry.verdict.clone())
    }

    pub fn store(&self, fingerprint: &str, verdict: ScanVerdict, matched_hashes: HashSet<String>) {
        self.entries.insert(
            fingerprint.to_string(),
            CacheEntry { verdict, inserted_at: std::time::Instant::now(), matched_hashes },
        );
    }

    pub fn invalidate(&self, fingerprint: &str) {
        self.entries.remove(fingerprint);
    }

    /// Invalidate every cached verdict whose matched indicator hashes
    /// intersect the given changed set. Called by the sync engine after a
    /// batch upsert touches those hashes.
    pub fn invalidate_by_value_hashes(&self, changed: &HashSet<String>) {
        self.entries.retain(|_, entry| entry.matched_hashes.is_disjoint(changed));
    }

    /// Run `produce` for a fingerprint if no other caller is already doing
    /// so; concurrent callers for the same fingerprint await the first
    /// caller's result instead of re-running the scan.
    pub async fn singleflight<F, Fut>(&self, fingerprint: &str, produce: F) -> ScanVerdict
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ScanVerdict>,
    {
        let cell = self
            .in_flight
            .entry(fingerprint.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = cell
            .get_or_init(|| async { produce().await })
            .await
            .clone();

        self.in_flight.remove(fingerprint);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;
    use crate::intel::TiVerdict;
    use crate::orchestrator::RiskLevel;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sample_verdict() -> ScanVerdict {
        let canonical = canonicalize("http://example.com/").unwrap();
        ScanVerdict {
            canonical,
            reachability: crate::reachability::ReachabilityState::Online,
            total_score: 0,
            max_score: 100,
            risk_level: RiskLevel::A,
            categories: Vec::new(),
            ti_score: 0,
            ti_verdict: TiVerdict::Clean,
            ti_matched_value_hashes: Vec::new(),
            generated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn get_respects_ttl() {
        let cache = ScanResultCache::new(Duration::from_millis(1));
        cache.store("fp1", sample_verdict(), HashSet::new());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("fp1").is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = ScanResultCache::new(Duration::from_secs(60));
        cache.store("fp1", sample_verdict(), HashSet::new());
        cache.invalidate("fp1");
        assert!(cache.get("fp1").is_none());
    }

    #[tokio::test]
    async fn singleflight_runs_producer_once() {
        let cache = Arc::new(ScanResultCache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .singleflight("fp1", || {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            sample_verdict()
                        }
                    })
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
