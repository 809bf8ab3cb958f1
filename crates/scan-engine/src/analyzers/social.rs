//! Social Engineering analyzer: scarcity, fake authority, emotional
//! manipulation and too-good-to-be-true language.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalyzerConfig;

use super::{Finding, ScanContext, Severity};

const CATEGORY_ID: &str = "social_engineering";

static SCARCITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(limited time|only \d+ (left|remaining)|offer expires|act (now|fast))").unwrap());
static FAKE_AUTHORITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(official (notice|government)|law enforcement|irs|fbi|tax authority)").unwrap());
static EMOTIONAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(you (have|'ve) been selected|congratulations|you (won|win)|your account is at risk)").unwrap());
static TOO_GOOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(guaranteed (return|income)|risk.?free|100% (free|guaranteed)|no strings attached)").unwrap());
static FAKE_SOCIAL_PROOF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{3,}[,.]?\d* (people|users|customers) (already|have) (joined|bought|claimed))").unwrap());

pub fn analyze(ctx: &ScanContext, cfg: &AnalyzerConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let Some(http) = ctx.evidence.http.as_ref() else {
        return findings;
    };
    let body = &http.body;

    let scarcity_hits = SCARCITY.find_iter(body).count();
    if scarcity_hits >= 3 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Scarcity / urgency phrasing",
            Severity::Medium,
            weight(cfg, "scarcity", 8),
            format!("{scarcity_hits} scarcity phrases"),
        ));
    }

    let authority_hits = FAKE_AUTHORITY.find_iter(body).count();
    if authority_hits >= 2 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Fake authority invocation",
            Severity::High,
            weight(cfg, "fake_authority", 12),
            format!("{authority_hits} references to official/legal authority"),
        ));
    }

    let emotional_hits = EMOTIONAL.find_iter(body).count();
    if emotional_hits >= 3 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Emotional manipulation language",
            Severity::Medium,
            weight(cfg, "emotional_manipulation", 8),
            format!("{emotional_hits} emotionally manipulative phrases"),
        ));
    }

    let too_good_hits = TOO_GOOD.find_iter(body).count();
    if too_good_hits >= 2 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Too-good-to-be-true claims",
            Severity::Medium,
            weight(cfg, "too_good_to_be_true", 8),
            format!("{too_good_hits} guaranteed-return-style claims"),
        ));
    }

    if FAKE_SOCIAL_PROOF.find_iter(body).count() >= 2 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Fabricated social proof",
            Severity::Low,
            weight(cfg, "fake_social_proof", 5),
            "repeated unverifiable claims of mass adoption",
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
    use crate::evidence::{EvidenceBundle, HttpEvidence};
    use crate::reachability::ReachabilityState;

    #[test]
    fn flags_fake_authority() {
        let canonical = canonicalize("http://example.com/").unwrap();
        let body = "Official Notice from the IRS. Law enforcement has been informed.";
        let evidence = EvidenceBundle {
            http: Some(HttpEvidence { status: 200, headers: Default::default(), body: body.to_string(), redirect_chain: Vec::new(), final_url: String::new() }),
            ..Default::default()
        };
        let cfg = AnalyzerConfig { enabled: true, max_weight: 30, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("authority")));
    }
}
