//! Rolling operational counters, exposed for `scanctl stats` and logged
//! periodically. Mirrors the engine's original running-average update
//! pattern for per-scan latency and hit/miss ratios.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct EngineStatsSnapshot {
    pub total_scans: u64,
    pub scans_with_findings: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub avg_scan_time_ms: f64,
    pub last_scan: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct EngineStats {
    total_scans: AtomicU64,
    scans_with_findings: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    avg_scan_time_ms: RwLock<f64>,
    last_scan: RwLock<Option<DateTime<Utc>>>,
}

impl EngineStats {
    pub fn record_scan(&self, duration_ms: u64, had_findings: bool) {
        let n = self.total_scans.fetch_add(1, Ordering::SeqCst) + 1;
        if had_findings {
            self.scans_with_findings.fetch_add(1, Ordering::SeqCst);
        }
        let mut avg = self.avg_scan_time_ms.write().unwrap();
        *avg = (*avg * (n - 1) as f64 + duration_ms as f64) / n as f64;
        *self.last_scan.write().unwrap() = Some(Utc::now());
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            total_scans: self.total_scans.load(Ordering::SeqCst),
            scans_with_findings: self.scans_with_findings.load(Ordering::SeqCst),
            cache_hits: self.cache_hits.load(Ordering::SeqCst),
            cache_misses: self.cache_misses.load(Ordering::SeqCst),
            avg_scan_time_ms: *self.avg_scan_time_ms.read().unwrap(),
            last_scan: *self.last_scan.read().unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_average_updates() {
        let stats = EngineStats::default();
        stats.record_scan(100, false);
        stats.record_scan(200, true);
        let snap = stats.snapshot();
        assert_eq!(snap.total_scans, 2);
        assert_eq!(snap.scans_with_findings, 1);
        assert!((snap.avg_scan_time_ms - 150.0).abs() < f64::EPSILON);
    }
}
