//! Email Security analyzer: SPF and DMARC posture for the registrable
//! domain, parsed with the same authentication-record parser the mail
//! pipeline uses for inbound messages.

use mail_auth::common::parse::TxtRecordParser;
use mail_auth::dmarc::{Dmarc, Policy as DmarcPolicy};
use mail_auth::spf::{Mechanism, Qualifier, Spf};

use crate::config::AnalyzerConfig;

use super::{Finding, ScanContext, Severity};

const CATEGORY_ID: &str = "email_security";

pub fn analyze(ctx: &ScanContext, cfg: &AnalyzerConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let Some(dns) = ctx.evidence.dns.as_ref() else {
        return findings;
    };

    let spf_record = dns.txt.iter().find(|t| t.starts_with("v=spf1"));
    match spf_record {
        None => {
            findings.push(Finding::new(
                CATEGORY_ID,
                "No SPF record",
                Severity::Medium,
                weight(cfg, "spf_missing", 10),
                "domain publishes no SPF TXT record",
            ));
        }
        Some(txt) => {
            if let Ok(spf) = Spf::parse(txt.as_bytes()) {
                match spf_all_qualifier(&spf) {
                    Some(Qualifier::SoftFail) => {
                        findings.push(Finding::new(
                            CATEGORY_ID,
                            "SPF soft-fail qualifier",
                            Severity::Low,
                            weight(cfg, "spf_softfail", 3),
                            "SPF ends in ~all rather than -all",
                        ));
                    }
                    Some(Qualifier::Pass) => {
                        findings.push(Finding::new(
                            CATEGORY_ID,
                            "Permissive SPF record",
                            Severity::High,
                            weight(cfg, "spf_permissive", 10),
                            "SPF ends in +all, allowing any sender",
                        ));
                    }
                    _ => {}
                }
            }
        }
    }

    let dmarc_record = dns.txt.iter().find(|t| t.starts_with("v=DMARC1"));
    match dmarc_record {
        None => {
            findings.push(Finding::new(
                CATEGORY_ID,
                "No DMARC record",
                Severity::Medium,
                weight(cfg, "dmarc_missing", 10),
                "domain publishes no DMARC TXT record at _dmarc",
            ));
        }
        Some(txt) => {
            if let Ok(dmarc) = Dmarc::parse(txt.as_bytes()) {
                if matches!(dmarc.p, DmarcPolicy::None) {
                    findings.push(Finding::new(
                        CATEGORY_ID,
                        "DMARC policy set to none",
                        Severity::Medium,
                        weight(cfg, "dmarc_policy_none", 8),
                        "DMARC is published but takes no enforcement action",
                    ));
                }
            }
        }
    }

    findings
}

fn weight(cfg: &AnalyzerConfig, key: &str, default: u32) -> u32 {
    cfg.check_weights.get(key).copied().unwrap_or(default)
}

/// The catch-all's qualifier is what `~all`/`+all`/`-all` actually encode;
/// `Record` keeps qualifier and mechanism on each directive separately.
fn spf_all_qualifier(record: &Spf) -> Option<Qualifier> {
    record
        .directives
        .iter()
        .find(|d| matches!(d.mechanism, Mechanism::All))
        .map(|d| d.qualifier.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;
    use crate::evidence::{DnsRecords, EvidenceBundle};
    use crate::reachability::ReachabilityState;

    #[test]
    fn flags_missing_spf_and_dmarc() {
        let canonical = canonicalize("http://example.com/").unwrap();
        let evidence = EvidenceBundle {
            dns: Some(DnsRecords::default()),
            ..Default::default()
        };
        let cfg = AnalyzerConfig { enabled: true, max_weight: 25, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("SPF")));
        assert!(findings.iter().any(|f| f.title.contains("DMARC")));
    }

    #[test]
    fn flags_permissive_spf() {
        let canonical = canonicalize("http://example.com/").unwrap();
        let evidence = EvidenceBundle {
            dns: Some(DnsRecords { txt: vec!["v=spf1 +all".to_string()], ..Default::default() }),
            ..Default::default()
        };
        let cfg = AnalyzerConfig { enabled: true, max_weight: 25, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("Permissive")));
    }
}
