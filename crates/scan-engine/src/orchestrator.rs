//! Scan Orchestrator: canonicalize, probe reachability, collect evidence,
//! fan out to threat intel and category analyzers, and aggregate a verdict.
//!
//! The parallel fan-out here generalizes the engine's original four-engine
//! `tokio::join!` pattern to N enabled analyzers, each wrapped in its own
//! timeout, with the whole step wrapped in a second timeout for the
//! scan-wide deadline.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyzers::{registry, CategoryResult, ScanContext};
use crate::cache::ScanResultCache;
use crate::canonical::{canonicalize, CanonicalUrl};
use crate::config::ScanEngineConfig;
use crate::error::{Result, ScanError};
use crate::evidence::EvidenceCollectors;
use crate::intel::{ThreatIntelEngine, TiVerdict};
use crate::reachability::{self, ReachabilityState};
use crate::stats::EngineStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    A,
    B,
    C,
    D,
    E,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanVerdict {
    pub canonical: CanonicalUrl,
    pub reachability: ReachabilityState,
    pub total_score: u32,
    pub max_score: u32,
    pub risk_level: RiskLevel,
    pub categories: Vec<CategoryResult>,
    pub ti_score: u32,
    pub ti_verdict: TiVerdict,
    pub ti_matched_value_hashes: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

pub struct ScanRequest {
    pub url: String,
    /// Skip the TI query cache on this scan, forcing a fresh indicator
    /// lookup. The scan result cache (whole-verdict, keyed by fingerprint)
    /// is a separate layer and is not affected by this flag.
    pub bypass_ti_cache: bool,
}

impl ScanRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), bypass_ti_cache: false }
    }
}

pub struct ScanOrchestrator {
    config: ScanEngineConfig,
    collectors: Arc<EvidenceCollectors>,
    intel: Arc<ThreatIntelEngine>,
    cache: Arc<ScanResultCache>,
    stats: Arc<EngineStats>,
}

impl ScanOrchestrator {
    pub fn new(
        config: ScanEngineConfig,
        collectors: Arc<EvidenceCollectors>,
        intel: Arc<ThreatIntelEngine>,
        cache: Arc<ScanResultCache>,
        stats: Arc<EngineStats>,
    ) -> Self {
        Self { config, collectors, intel, cache, stats }
    }

    pub fn config(&self) -> &ScanEngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ScanResultCache> {
        &self.cache
    }

    pub fn intel(&self) -> &Arc<ThreatIntelEngine> {
        &self.intel
    }

    pub async fn scan(&self, request: ScanRequest) -> Result<ScanVerdict> {
        let canonical = canonicalize(&request.url)?;
        let fingerprint = canonical.fingerprint_hash.clone();

        if let Some(cached) = self.cache.get(&fingerprint) {
            self.stats.record_cache_hit();
            return Ok(cached);
        }
        self.stats.record_cache_miss();

        let config = self.config.clone();
        let collectors = self.collectors.clone();
        let intel = self.intel.clone();
        let stats = self.stats.clone();
        let canonical_for_run = canonical.clone();

        let bypass_ti_cache = request.bypass_ti_cache;
        let verdict = self
            .cache
            .singleflight(&fingerprint, move || async move {
                run_scan(canonical_for_run, config, collectors, intel, stats, bypass_ti_cache).await
            })
            .await;

        let matched_hashes: HashSet<String> = verdict.ti_matched_value_hashes.iter().cloned().collect();
        self.cache.store(&fingerprint, verdict.clone(), matched_hashes);

        Ok(verdict)
    }
}

/// The actual scan body, run at most once per fingerprint by the
/// singleflight wrapper above. Never returns an error: every failure mode
/// degrades into a Skipped category or a missing evidence field instead.
async fn run_scan(
    canonical: CanonicalUrl,
    config: ScanEngineConfig,
    collectors: Arc<EvidenceCollectors>,
    intel: Arc<ThreatIntelEngine>,
    stats: Arc<EngineStats>,
    bypass_ti_cache: bool,
) -> ScanVerdict {
    let started = Instant::now();
    let scan_deadline = Duration::from_millis(config.orchestrator.scan_deadline_ms);

    let outcome = tokio::time::timeout(scan_deadline, async {
        let evidence = collectors.collect(&canonical, &config.orchestrator).await;

        let dns_ok = evidence.dns.as_ref().map(|d| !d.a.is_empty() || !d.aaaa.is_empty()).unwrap_or(false);
        let tcp_ok = evidence.http.is_some() || evidence.tls.is_some();
        let reachability = reachability::classify(dns_ok, tcp_ok, evidence.http.as_ref());

        let ctx = ScanContext { canonical: &canonical, evidence: &evidence, reachability };

        let enabled: Vec<_> = registry()
            .iter()
            .filter(|d| {
                config
                    .analyzers
                    .get(d.category_id)
                    .map(|c| c.enabled)
                    .unwrap_or(true)
                    && (d.should_run)(reachability)
            })
            .collect();

        let mut category_futures = Vec::new();
        for descriptor in &enabled {
            let budget_ms = config
                .analyzers
                .get(descriptor.category_id)
                .map(|c| c.budget_ms)
                .unwrap_or(3_000);
            category_futures.push(run_one_analyzer(descriptor, &ctx, &config, budget_ms));
        }

        let (ti_result, categories) = tokio::join!(
            intel.query(&canonical, evidence.resolved_ip, bypass_ti_cache),
            futures::future::join_all(category_futures),
        );

        (reachability, ti_result, categories)
    })
    .await;

    let (reachability, ti_result, categories) = match outcome {
        Ok((reachability, ti_result, categories)) => (reachability, Some(ti_result), categories),
        Err(_) => {
            warn!(fingerprint = %canonical.fingerprint_hash, "scan deadline exceeded");
            let categories = registry()
                .iter()
                .map(|d| {
                    let max_weight = config.analyzers.get(d.category_id).map(|c| c.max_weight).unwrap_or(0);
                    CategoryResult::skipped(d.category_id, d.category_name, max_weight, "deadline_exceeded")
                })
                .collect();
            // Evidence collection never finished, so reachability was never
            // actually probed; Offline is the closest of the four defined
            // states to "could not establish the target responds".
            (ReachabilityState::Offline, None, categories)
        }
    };

    let ti_result = ti_result.unwrap_or(crate::intel::TiQueryResult {
        matches: Vec::new(),
        score: 0,
        verdict: TiVerdict::Unknown,
        cache_hit: false,
    });
    let ti_matched_value_hashes: Vec<String> =
        ti_result.matches.iter().map(|m| m.indicator.value_hash.clone()).collect();

    let total_category_score: u32 = categories.iter().map(|c| c.score).sum();
    let total_category_max: u32 = categories.iter().map(|c| c.max_weight).sum();
    let total_score = total_category_score + ti_result.score;
    let max_score = total_category_max + config.orchestrator.ti_weight;

    let risk_level = risk_band(total_score, max_score, &config.orchestrator.risk_bands);

    stats.record_scan(started.elapsed().as_millis() as u64, total_score > 0);
    info!(
        fingerprint = %canonical.fingerprint_hash,
        total_score,
        max_score,
        ?risk_level,
        "scan complete"
    );

    ScanVerdict {
        canonical,
        reachability,
        total_score,
        max_score,
        risk_level,
        categories,
        ti_score: ti_result.score,
        ti_verdict: ti_result.verdict,
        ti_matched_value_hashes,
        generated_at: Utc::now(),
    }
}

async fn run_one_analyzer(
    descriptor: &crate::analyzers::AnalyzerDescriptor,
    ctx: &ScanContext<'_>,
    config: &ScanEngineConfig,
    budget_ms: u64,
) -> CategoryResult {
    let default_cfg = crate::config::AnalyzerConfig {
        enabled: true,
        max_weight: 0,
        budget_ms,
        check_weights: Default::default(),
    };
    let analyzer_cfg = config.analyzers.get(descriptor.category_id).unwrap_or(&default_cfg);
    let started = Instant::now();

    let analyze_fn = descriptor.analyze;
    let category_id = descriptor.category_id.to_string();
    let category_name = descriptor.category_name.to_string();
    let max_weight = analyzer_cfg.max_weight;

    // Category analyzers are synchronous and pure; run them on a blocking
    // thread only if they could stall the executor. Here the work is cheap
    // regex scanning, so run inline but still respect the per-analyzer
    // timeout via yield points between checks is unnecessary: cap with
    // tokio::time::timeout around an already-sync call via a oneshot future.
    let result = tokio::time::timeout(Duration::from_millis(budget_ms), async {
        analyze_fn(ctx, analyzer_cfg)
    })
    .await;

    match result {
        Ok(findings) => {
            let checks_run = findings.len() as u32;
            CategoryResult::from_findings(
                &category_id,
                &category_name,
                max_weight,
                findings,
                checks_run,
                started.elapsed().as_millis() as u64,
            )
        }
        Err(_) => CategoryResult::skipped(&category_id, &category_name, max_weight, "deadline_exceeded"),
    }
}

fn risk_band(total: u32, max: u32, bands: &crate::config::RiskBands) -> RiskLevel {
    if max == 0 {
        return RiskLevel::A;
    }
    let pct = (total as f64 / max as f64) * 100.0;
    if pct <= bands.a_max_pct {
        RiskLevel::A
    } else if pct <= bands.b_max_pct {
        RiskLevel::B
    } else if pct <= bands.c_max_pct {
        RiskLevel::C
    } else if pct <= bands.d_max_pct {
        RiskLevel::D
    } else {
        RiskLevel::E
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiskBands;

    #[test]
    fn risk_band_boundaries() {
        let bands = RiskBands::default();
        assert_eq!(risk_band(10, 100, &bands), RiskLevel::A);
        assert_eq!(risk_band(20, 100, &bands), RiskLevel::B);
        assert_eq!(risk_band(40, 100, &bands), RiskLevel::C);
        assert_eq!(risk_band(60, 100, &bands), RiskLevel::D);
        assert_eq!(risk_band(90, 100, &bands), RiskLevel::E);
    }

    #[test]
    fn risk_band_handles_zero_max() {
        let bands = RiskBands::default();
        assert_eq!(risk_band(0, 0, &bands), RiskLevel::A);
    }
}
