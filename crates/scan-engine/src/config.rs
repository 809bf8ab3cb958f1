//! Configuration for the scan engine.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the scan engine, loaded from `scan-engine.toml`
/// with environment overrides of the form `SCAN_ENGINE__SECTION__KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEngineConfig {
    pub orchestrator: OrchestratorConfig,
    pub analyzers: HashMap<String, AnalyzerConfig>,
    pub threat_intel: ThreatIntelConfig,
    pub sync: SyncConfig,
    pub sources: Vec<ThreatIntelSourceConfig>,
    pub max_events_history: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub scan_deadline_ms: u64,
    pub dns_budget_ms: u64,
    pub tcp_budget_ms: u64,
    pub tls_budget_ms: u64,
    pub http_budget_ms: u64,
    pub whois_budget_ms: u64,
    pub evidence_budget_ms: u64,
    pub risk_bands: RiskBands,
    pub ti_weight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskBands {
    /// Upper bound (percent of max score, 0-100) for each risk level, checked in order A..E.
    pub a_max_pct: f64,
    pub b_max_pct: f64,
    pub c_max_pct: f64,
    pub d_max_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub enabled: bool,
    pub max_weight: u32,
    pub budget_ms: u64,
    pub check_weights: HashMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatIntelConfig {
    pub max_weight: u32,
    pub suspicious_threshold: f64,
    pub malicious_threshold: f64,
    pub cache_ttl: Duration,
    pub strategy_multipliers: StrategyMultipliers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyMultipliers {
    pub exact: f64,
    pub domain: f64,
    pub ip: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub max_concurrent_syncs: usize,
    pub retry_policy: RetryPolicy,
    pub run_deadline: Duration,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatIntelSourceConfig {
    pub id: String,
    pub name: String,
    pub source_type: String,
    pub url: String,
    pub enabled: bool,
    pub default_weight: f64,
    pub priority: u8,
    pub reliability: f64,
    pub sync_frequency_seconds: u64,
    pub requires_auth: bool,
    pub rate_limit_per_minute: u32,
    pub cache_timeout_seconds: u64,
}

impl Default for ScanEngineConfig {
    fn default() -> Self {
        Self {
            orchestrator: OrchestratorConfig::default(),
            analyzers: default_analyzer_configs(),
            threat_intel: ThreatIntelConfig::default(),
            sync: SyncConfig::default(),
            sources: Vec::new(),
            max_events_history: 10_000,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            scan_deadline_ms: 15_000,
            dns_budget_ms: 1_000,
            tcp_budget_ms: 2_000,
            tls_budget_ms: 2_000,
            http_budget_ms: 6_000,
            whois_budget_ms: 5_000,
            evidence_budget_ms: 8_000,
            risk_bands: RiskBands::default(),
            ti_weight: 100,
        }
    }
}

impl Default for RiskBands {
    fn default() -> Self {
        Self {
            a_max_pct: 15.0,
            b_max_pct: 30.0,
            c_max_pct: 50.0,
            d_max_pct: 75.0,
        }
    }
}

impl Default for ThreatIntelConfig {
    fn default() -> Self {
        Self {
            max_weight: 100,
            suspicious_threshold: 30.0,
            malicious_threshold: 60.0,
            cache_ttl: Duration::from_secs(24 * 3600),
            strategy_multipliers: StrategyMultipliers {
                exact: 1.0,
                domain: 0.9,
                ip: 0.7,
            },
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_syncs: 5,
            retry_policy: RetryPolicy {
                max_attempts: 3,
                initial_backoff_ms: 500,
                backoff_multiplier: 2.0,
            },
            run_deadline: Duration::from_secs(600),
            batch_size: 1_000,
        }
    }
}

/// Default `{category_id -> AnalyzerConfig}` map, one entry per category
/// analyzer named in the scoring table. Max weights match the reference
/// defaults; deployments override them per-environment.
fn default_analyzer_configs() -> HashMap<String, AnalyzerConfig> {
    let defaults: &[(&str, u32)] = &[
        ("domain_whois_tld", 40),
        ("content", 40),
        ("phishing_patterns", 50),
        ("behavioral_js", 25),
        ("social_engineering", 30),
        ("financial_fraud", 25),
        ("identity_theft", 20),
        ("data_protection", 50),
        ("legal_compliance", 35),
        ("email_security", 25),
        ("redirect_chain", 15),
        ("trust_graph", 30),
    ];

    defaults
        .iter()
        .map(|(id, max_weight)| {
            (
                (*id).to_string(),
                AnalyzerConfig {
                    enabled: true,
                    max_weight: *max_weight,
                    budget_ms: 3_000,
                    check_weights: HashMap::new(),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanEngineConfig::default();
        assert_eq!(config.analyzers.len(), 12);
        assert_eq!(config.orchestrator.scan_deadline_ms, 15_000);
        assert_eq!(config.sync.max_concurrent_syncs, 5);
    }

    #[test]
    fn test_config_serialization() {
        let config = ScanEngineConfig::default();
        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: ScanEngineConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(config.max_events_history, deserialized.max_events_history);
    }

    #[test]
    fn test_risk_bands_monotonic() {
        let bands = RiskBands::default();
        assert!(bands.a_max_pct < bands.b_max_pct);
        assert!(bands.b_max_pct < bands.c_max_pct);
        assert!(bands.c_max_pct < bands.d_max_pct);
    }
}
