//! Phishing Patterns analyzer: login forms, sensitive fields, off-brand
//! domains mentioning a brand, and cross-domain form submission.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalyzerConfig;

use super::{Finding, ScanContext, Severity};

const CATEGORY_ID: &str = "phishing_patterns";

static PASSWORD_FIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)type=["']?password["']?"#).unwrap());
static SENSITIVE_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)name=["']?(ssn|card|cvv|pin|social.?security|mother.?s.?maiden)"#).unwrap()
});
static URGENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(urgent|immediate(ly)? action|verify (your )?account|account (will be )?suspended|act now)").unwrap()
});
static HIDDEN_IFRAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<iframe[^>]+(display:\s*none|width=["']?0["']?|height=["']?0["']?)"#).unwrap());
static FORM_ACTION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)<form[^>]+action=["']([^"']+)["']"#).unwrap());
static SECURITY_BADGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(norton secured|mcafee secure|verified by visa|verisign trusted|truste certified|256-?bit encryption|bbb accredited)").unwrap()
});

const BRANDS: &[&str] = &["paypal", "amazon", "microsoft", "apple", "google", "bankofamerica"];

pub fn analyze(ctx: &ScanContext, cfg: &AnalyzerConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let Some(http) = ctx.evidence.http.as_ref() else {
        return findings;
    };
    let body = &http.body;
    let lower = body.to_lowercase();

    let password_fields = PASSWORD_FIELD.find_iter(body).count();
    if password_fields >= 2 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Multiple password fields",
            Severity::Medium,
            weight(cfg, "multiple_password_fields", 10),
            format!("{password_fields} password inputs on one page"),
        ));
    }

    let sensitive_fields = SENSITIVE_FIELD.find_iter(body).count();
    if sensitive_fields >= 3 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Excessive sensitive input fields",
            Severity::High,
            weight(cfg, "sensitive_fields", 15),
            format!("{sensitive_fields} sensitive-looking input names"),
        ));
    }

    let brand_mentioned = BRANDS.iter().any(|b| lower.contains(b));
    let is_brand_domain = BRANDS.iter().any(|b| ctx.canonical.registrable_domain.contains(b));
    if brand_mentioned && !is_brand_domain {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Brand mentioned on an unaffiliated domain",
            Severity::Critical,
            weight(cfg, "brand_off_domain", 20),
            "page content references a known brand that does not own this domain",
        ));
    }

    let urgency_hits = URGENCY.find_iter(body).count();
    if urgency_hits > 0 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Urgency language",
            Severity::Medium,
            weight(cfg, "urgency_language", 10).min(urgency_hits as u32 * 5),
            format!("{urgency_hits} urgency phrase(s) found"),
        ));
    }

    if let Some(captures) = FORM_ACTION.captures(body) {
        if let Some(action) = captures.get(1) {
            let action_str = action.as_str();
            if action_str.starts_with("http") && !action_str.contains(&ctx.canonical.registrable_domain) {
                findings.push(Finding::new(
                    CATEGORY_ID,
                    "Form submits to a different domain",
                    Severity::High,
                    weight(cfg, "cross_domain_form", 15),
                    format!("form action points at {action_str}"),
                ));
            }
        }
    }

    if HIDDEN_IFRAME.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Hidden iframe",
            Severity::Medium,
            weight(cfg, "hidden_iframe", 10),
            "page embeds a zero-size or display:none iframe",
        ));
    }

    if SECURITY_BADGE.is_match(body) {
        let actually_verified =
            ctx.canonical.scheme == "https" && ctx.evidence.tls.as_ref().is_some_and(|tls| tls.valid);
        if !actually_verified {
            findings.push(Finding::new(
                CATEGORY_ID,
                "Fake security badge",
                Severity::High,
                weight(cfg, "fake_security_badge", 15),
                "page displays a trust/security seal that isn't backed by a verified connection",
            ));
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

    fn body_ctx(body: &str, host_url: &str) -> (crate::canonical::CanonicalUrl, EvidenceBundle) {
        let canonical = canonicalize(host_url).unwrap();
        let evidence = EvidenceBundle {
            http: Some(HttpEvidence { status: 200, headers: Default::default(), body: body.to_string(), redirect_chain: Vec::new(), final_url: host_url.to_string() }),
            ..Default::default()
        };
        (canonical, evidence)
    }

    #[test]
    fn flags_off_brand_mention() {
        let (canonical, evidence) = body_ctx("Verify your PayPal account now", "http://secure-login-verify.tk/");
        let cfg = AnalyzerConfig { enabled: true, max_weight: 50, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("Brand mentioned")));
        assert!(findings.iter().any(|f| f.title.contains("Urgency")));
    }

    #[test]
    fn flags_fake_security_badge_on_unverified_connection() {
        let (canonical, evidence) = body_ctx("Site protected by Norton Secured", "http://example.com/");
        let cfg = AnalyzerConfig { enabled: true, max_weight: 50, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("Fake security badge")));
    }

    #[test]
    fn does_not_flag_badge_over_verified_tls() {
        let (canonical, mut evidence) = body_ctx("Site protected by Norton Secured", "https://example.com/");
        evidence.tls = Some(crate::evidence::TlsInfo { valid: true, issuer: None, subject: None, not_after: None });
        let cfg = AnalyzerConfig { enabled: true, max_weight: 50, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(!findings.iter().any(|f| f.title.contains("Fake security badge")));
    }
}
