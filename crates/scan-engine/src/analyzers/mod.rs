//! Category analyzers: deterministic, stateless scoring rules run against a
//! [`ScanContext`]. Analyzers are plain data (id/weight/predicate/function),
//! not trait objects, so the set of enabled analyzers is just a filtered
//! slice rather than a dynamic-dispatch hierarchy.

pub mod behavioral;
pub mod content;
pub mod data_protection;
pub mod domain;
pub mod email_security;
pub mod financial;
pub mod identity;
pub mod legal;
pub mod phishing;
pub mod redirect;
pub mod social;
pub mod trust_graph;

use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalUrl;
use crate::config::AnalyzerConfig;
use crate::evidence::EvidenceBundle;
use crate::reachability::ReachabilityState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub points: u32,
    pub category_id: String,
    pub description: String,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, serde_json::Value>,
}

impl Finding {
    pub fn new(
        category_id: &str,
        title: impl Into<String>,
        severity: Severity,
        points: u32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            severity,
            points,
            category_id: category_id.to_string(),
            description: description.into(),
            metadata: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResult {
    pub category_id: String,
    pub category_name: String,
    pub score: u32,
    pub max_weight: u32,
    pub findings: Vec<Finding>,
    pub checks_run: u32,
    pub checks_skipped: u32,
    pub duration_ms: u64,
    pub skipped: bool,
    pub skipped_reason: Option<String>,
}

impl CategoryResult {
    pub fn from_findings(
        category_id: &str,
        category_name: &str,
        max_weight: u32,
        findings: Vec<Finding>,
        checks_run: u32,
        duration_ms: u64,
    ) -> Self {
        let raw_score: u32 = findings.iter().map(|f| f.points).sum();
        Self {
            category_id: category_id.to_string(),
            category_name: category_name.to_string(),
            score: raw_score.min(max_weight),
            max_weight,
            findings,
            checks_run,
            checks_skipped: 0,
            duration_ms,
            skipped: false,
            skipped_reason: None,
        }
    }

    pub fn skipped(category_id: &str, category_name: &str, max_weight: u32, reason: &str) -> Self {
        Self {
            category_id: category_id.to_string(),
            category_name: category_name.to_string(),
            score: 0,
            max_weight,
            findings: Vec::new(),
            checks_run: 0,
            checks_skipped: 1,
            duration_ms: 0,
            skipped: true,
            skipped_reason: Some(reason.to_string()),
        }
    }
}

/// Read-only view handed to every analyzer. Borrowing only, never mutated:
/// analyzers share no state with each other.
pub struct ScanContext<'a> {
    pub canonical: &'a CanonicalUrl,
    pub evidence: &'a EvidenceBundle,
    pub reachability: ReachabilityState,
}

pub type AnalyzeFn = fn(&ScanContext, &AnalyzerConfig) -> Vec<Finding>;
pub type ShouldRunFn = fn(ReachabilityState) -> bool;

/// Static descriptor for one category analyzer. The registry below is the
/// tagged-value replacement for a `dyn Analyzer` object hierarchy: adding an
/// analyzer means adding one array entry, not a new trait impl.
pub struct AnalyzerDescriptor {
    pub category_id: &'static str,
    pub category_name: &'static str,
    pub should_run: ShouldRunFn,
    pub analyze: AnalyzeFn,
}

pub fn registry() -> &'static [AnalyzerDescriptor] {
    use ReachabilityState::*;

    fn always(_: ReachabilityState) -> bool {
        true
    }
    fn online_only(r: ReachabilityState) -> bool {
        matches!(r, Online)
    }
    fn online_or_parked(r: ReachabilityState) -> bool {
        matches!(r, Online | Parked)
    }
    fn not_offline(r: ReachabilityState) -> bool {
        !matches!(r, Offline)
    }

    const REGISTRY: &[AnalyzerDescriptor] = &[
        AnalyzerDescriptor {
            category_id: "domain_whois_tld",
            category_name: "Domain/WHOIS/TLD",
            should_run: always,
            analyze: domain::analyze,
        },
        AnalyzerDescriptor {
            category_id: "content",
            category_name: "Content",
            should_run: not_offline,
            analyze: content::analyze,
        },
        AnalyzerDescriptor {
            category_id: "phishing_patterns",
            category_name: "Phishing Patterns",
            should_run: online_or_parked,
            analyze: phishing::analyze,
        },
        AnalyzerDescriptor {
            category_id: "behavioral_js",
            category_name: "Behavioral JS",
            should_run: online_only,
            analyze: behavioral::analyze,
        },
        AnalyzerDescriptor {
            category_id: "social_engineering",
            category_name: "Social Engineering",
            should_run: online_or_parked,
            analyze: social::analyze,
        },
        AnalyzerDescriptor {
            category_id: "financial_fraud",
            category_name: "Financial Fraud",
            should_run: online_only,
            analyze: financial::analyze,
        },
        AnalyzerDescriptor {
            category_id: "identity_theft",
            category_name: "Identity Theft",
            should_run: online_only,
            analyze: identity::analyze,
        },
        AnalyzerDescriptor {
            category_id: "data_protection",
            category_name: "Data Protection",
            should_run: online_only,
            analyze: data_protection::analyze,
        },
        AnalyzerDescriptor {
            category_id: "legal_compliance",
            category_name: "Legal Compliance",
            should_run: always,
            analyze: legal::analyze,
        },
        AnalyzerDescriptor {
            category_id: "email_security",
            category_name: "Email Security",
            should_run: always,
            analyze: email_security::analyze,
        },
        AnalyzerDescriptor {
            category_id: "redirect_chain",
            category_name: "Redirect Chain",
            should_run: online_or_parked,
            analyze: redirect::analyze,
        },
        AnalyzerDescriptor {
            category_id: "trust_graph",
            category_name: "Trust Graph",
            should_run: always,
            analyze: trust_graph::analyze,
        },
    ];
    REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_result_caps_score_at_max_weight() {
        let findings = vec![
            Finding::new("x", "a", Severity::Low, 30, "d"),
            Finding::new("x", "b", Severity::Low, 30, "d"),
        ];
        let result = CategoryResult::from_findings("x", "X", 40, findings, 2, 5);
        assert_eq!(result.score, 40);
    }

    #[test]
    fn registry_has_twelve_analyzers() {
        assert_eq!(registry().len(), 12);
    }
}
