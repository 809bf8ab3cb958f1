//! Trust Graph analyzer: weak signals about the surrounding infrastructure
//! — absent MX/NS diversity, IP-literal hostnames and very young domains
//! with no established reputation.

use crate::config::AnalyzerConfig;

use super::{Finding, ScanContext, Severity};

const CATEGORY_ID: &str = "trust_graph";

pub fn analyze(ctx: &ScanContext, cfg: &AnalyzerConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    if ctx.canonical.host.parse::<std::net::IpAddr>().is_ok() {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Hostname is a raw IP literal",
            Severity::Medium,
            weight(cfg, "ip_literal_host", 10),
            "the URL hostname is an IP address rather than a domain name",
        ));
    }

    if let Some(dns) = ctx.evidence.dns.as_ref() {
        if dns.mx.is_empty() {
            findings.push(Finding::new(
                CATEGORY_ID,
                "No mail exchange records",
                Severity::Low,
                weight(cfg, "absent_mx", 3),
                "domain has no MX records, unusual for an established business",
            ));
        }
        if dns.ns.len() == 1 {
            findings.push(Finding::new(
                CATEGORY_ID,
                "Single nameserver",
                Severity::Low,
                weight(cfg, "single_ns", 5),
                "domain relies on a single authoritative nameserver",
            ));
        }
    }

    let young_and_unestablished = ctx
        .evidence
        .whois
        .as_ref()
        .and_then(|w| w.created_at)
        .map(|created| (chrono::Utc::now() - created).num_days() < 30)
        .unwrap_or(false);
    if young_and_unestablished {
        findings.push(Finding::new(
            CATEGORY_ID,
            "No established reputation",
            Severity::Medium,
            weight(cfg, "no_reputation_history", 12),
            "domain is under 30 days old with no accumulated trust signal",
        ));
    }

    findings
}

fn weight(cfg: &AnalyzerConfig, key: &str, default: u32) -> u32 {
    cfg.check_weights.get(key).copied().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;
    use crate::evidence::{DnsRecords, EvidenceBundle};
    use crate::reachability::ReachabilityState;

    #[test]
    fn flags_ip_literal_host() {
        let canonical = canonicalize("http://192.0.2.10/").unwrap();
        let evidence = EvidenceBundle::default();
        let cfg = AnalyzerConfig { enabled: true, max_weight: 30, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("IP literal")));
    }

    #[test]
    fn flags_single_nameserver() {
        let canonical = canonicalize("http://example.com/").unwrap();
        let evidence = EvidenceBundle {
            dns: Some(DnsRecords { ns: vec!["ns1.example.com".to_string()], ..Default::default() }),
            ..Default::default()
        };
        let cfg = AnalyzerConfig { enabled: true, max_weight: 30, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("Single nameserver")));
    }
}
