//! Legal Compliance analyzer: jurisdiction risk, missing terms of service,
//! unverified age-gated content and misleading marketing claims.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalyzerConfig;

use super::{Finding, ScanContext, Severity};

const CATEGORY_ID: &str = "legal_compliance";

const HIGH_RISK_JURISDICTION_TLDS: &[&str] = &["tk", "ml", "ga", "cf"];

static TERMS_OF_SERVICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(terms of service|terms and conditions|terms of use)").unwrap());
static GAMBLING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(casino|sportsbook|betting odds|slot machine)").unwrap());
static ADULT_CONTENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(adult content|18\+ only|xxx)").unwrap());
static AGE_VERIFICATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(confirm (you are|your age)|are you (18|21)|age verification)").unwrap());
static CHILDREN_TARGETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(for kids|children('s)? games|ages? (3|4|5|6|7|8|9|10|11|12)\b)").unwrap());
static PARENTAL_CONSENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(parental consent|ask a parent|with your parent)").unwrap());
static MISLEADING_CLAIM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(scientifically proven|doctors hate (this|him|her)|clinically proven to cure|fda approved\*?)").unwrap());

pub fn analyze(ctx: &ScanContext, cfg: &AnalyzerConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    let tld = ctx.canonical.tld.rsplit('.').next().unwrap_or(&ctx.canonical.tld);
    let jurisdiction_risk = HIGH_RISK_JURISDICTION_TLDS.contains(&tld)
        || ctx
            .evidence
            .whois
            .as_ref()
            .and_then(|w| w.registrant_country.as_deref())
            .map(|c| HIGH_RISK_JURISDICTION_TLDS.iter().any(|t| c.eq_ignore_ascii_case(t)))
            .unwrap_or(false);
    if jurisdiction_risk {
        findings.push(Finding::new(
            CATEGORY_ID,
            "High-risk jurisdiction",
            Severity::Low,
            weight(cfg, "jurisdiction_risk", 5),
            "registration TLD/country is associated with weak consumer-protection enforcement",
        ));
    }

    let Some(http) = ctx.evidence.http.as_ref() else {
        return findings;
    };
    let body = &http.body;

    if !TERMS_OF_SERVICE.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "No terms of service",
            Severity::Low,
            weight(cfg, "no_terms_of_service", 5),
            "page does not link to terms of service",
        ));
    }

    let is_gambling = GAMBLING.is_match(body);
    let is_adult = ADULT_CONTENT.is_match(body);
    if (is_gambling || is_adult) && !AGE_VERIFICATION.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Age-restricted content without age verification",
            Severity::High,
            weight(cfg, "missing_age_verification", 12),
            "gambling or adult content with no age gate",
        ));
    }

    if CHILDREN_TARGETED.is_match(body) && !PARENTAL_CONSENT.is_match(body) {
        let collects_data = body.to_lowercase().contains("email") || body.to_lowercase().contains("sign up");
        if collects_data {
            findings.push(Finding::new(
                CATEGORY_ID,
                "Children-targeted data collection without parental consent",
                Severity::Critical,
                weight(cfg, "coppa_risk", 15),
                "content targets children and collects data without a parental-consent flow",
            ));
        }
    }

    let misleading_hits = MISLEADING_CLAIM.find_iter(body).count();
    if misleading_hits >= 3 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Misleading marketing claims",
            Severity::Medium,
            weight(cfg, "misleading_marketing", 8),
            format!("{misleading_hits} unverifiable marketing claims"),
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
    use crate::evidence::EvidenceBundle;
    use crate::reachability::ReachabilityState;

    #[test]
    fn flags_jurisdiction_without_http_evidence() {
        let canonical = canonicalize("http://free-site.tk/").unwrap();
        let evidence = EvidenceBundle::default();
        let cfg = AnalyzerConfig { enabled: true, max_weight: 35, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Offline }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("jurisdiction")));
    }
}
