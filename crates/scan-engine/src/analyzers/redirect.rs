//! Redirect Chain analyzer: cloaking via long chains, cross-domain hops and
//! known URL shorteners.

use crate::config::AnalyzerConfig;

use super::{Finding, ScanContext, Severity};

const CATEGORY_ID: &str = "redirect_chain";

const SHORTENER_HOSTS: &[&str] = &["bit.ly", "tinyurl.com", "t.co", "goo.gl", "ow.ly", "is.gd"];

pub fn analyze(ctx: &ScanContext, cfg: &AnalyzerConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let Some(http) = ctx.evidence.http.as_ref() else {
        return findings;
    };
    let chain = &http.redirect_chain;
    if chain.is_empty() {
        return findings;
    }

    if chain.len() >= 3 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Long redirect chain",
            Severity::Medium,
            weight(cfg, "long_chain", 8),
            format!("{} hops before landing", chain.len()),
        ));
    }

    let distinct_domains: std::collections::HashSet<_> = chain
        .iter()
        .filter_map(|u| url::Url::parse(u).ok())
        .filter_map(|u| u.host_str().map(|h| h.to_string()))
        .collect();
    if distinct_domains.len() >= 3 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Chain crosses many distinct domains",
            Severity::Medium,
            weight(cfg, "cross_domain_chain", 8),
            format!("{} distinct domains in the chain", distinct_domains.len()),
        ));
    }

    let hops_through_shortener = chain.iter().any(|u| {
        SHORTENER_HOSTS
            .iter()
            .any(|h| url::Url::parse(u).ok().and_then(|p| p.host_str().map(|s| s == *h)).unwrap_or(false))
    });
    if hops_through_shortener {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Hops through a known URL shortener",
            Severity::Low,
            weight(cfg, "shortener_hop", 4),
            "redirect chain includes a known shortener host",
        ));
    }

    if let Some(first) = chain.first() {
        if let Some(first_host) = url::Url::parse(first).ok().and_then(|u| u.host_str().map(|h| h.to_string())) {
            if first_host != ctx.canonical.host && !http.final_url.contains(&first_host) {
                findings.push(Finding::new(
                    CATEGORY_ID,
                    "Final domain differs from the originally requested domain",
                    Severity::High,
                    weight(cfg, "cloaking", 10),
                    "the chain landed on a different registrable domain than requested",
                ));
            }
        }
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
    use crate::evidence::{EvidenceBundle, HttpEvidence};
    use crate::reachability::ReachabilityState;

    #[test]
    fn flags_long_chain_and_shortener() {
        let canonical = canonicalize("http://bit.ly/abc").unwrap();
        let evidence = EvidenceBundle {
            http: Some(HttpEvidence {
                status: 200,
                headers: Default::default(),
                body: String::new(),
                redirect_chain: vec![
                    "http://bit.ly/abc".to_string(),
                    "http://tracker.example/r".to_string(),
                    "http://final.example/landing".to_string(),
                ],
                final_url: "http://final.example/landing".to_string(),
            }),
            ..Default::default()
        };
        let cfg = AnalyzerConfig { enabled: true, max_weight: 15, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("shortener")));
        assert!(findings.iter().any(|f| f.title.contains("Long redirect")));
    }
}
