//! Data Protection analyzer: privacy-policy presence, consent for cookies
//! and trackers, and forms collecting sensitive data over plaintext.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalyzerConfig;

use super::{Finding, ScanContext, Severity};

const CATEGORY_ID: &str = "data_protection";

static PRIVACY_POLICY_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)privacy.?policy").unwrap());
static GDPR_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(gdpr|general data protection regulation)").unwrap());
static CONSENT_BANNER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(cookie.?consent|accept (all )?cookies|we use cookies)"#).unwrap());
static SENSITIVE_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)name=["']?(ssn|health|medical|religion|sexual.?orientation|card.?number)"#).unwrap()
});
static KNOWN_TRACKERS: &[&str] = &[
    "google-analytics.com",
    "doubleclick.net",
    "facebook.net",
    "hotjar.com",
    "segment.io",
];

pub fn analyze(ctx: &ScanContext, cfg: &AnalyzerConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let Some(http) = ctx.evidence.http.as_ref() else {
        return findings;
    };
    let body = &http.body;

    let has_policy = PRIVACY_POLICY_LINK.is_match(body);
    if !has_policy {
        findings.push(Finding::new(
            CATEGORY_ID,
            "No privacy policy found",
            Severity::Medium,
            weight(cfg, "no_privacy_policy", 12),
            "page does not link to a privacy policy",
        ));
    }

    let sensitive_hits = SENSITIVE_FIELD.find_iter(body).count();
    if sensitive_hits >= 3 && !has_policy {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Sensitive data collected without a policy",
            Severity::High,
            weight(cfg, "sensitive_without_policy", 15),
            format!("{sensitive_hits} sensitive fields and no privacy policy"),
        ));
    }

    let tracker_hits = KNOWN_TRACKERS.iter().filter(|t| body.contains(*t)).count();
    let has_consent = CONSENT_BANNER.is_match(body);
    if tracker_hits > 0 && !has_consent {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Trackers loaded without a consent banner",
            Severity::Medium,
            weight(cfg, "trackers_without_consent", 10),
            format!("{tracker_hits} known tracker domain(s) referenced"),
        ));
    }

    if tracker_hits >= 3 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Multiple third-party trackers",
            Severity::Low,
            weight(cfg, "multiple_trackers", 5),
            format!("{tracker_hits} distinct tracker domains"),
        ));
    }

    if sensitive_hits > 0 && !GDPR_MENTION.is_match(body) && !has_policy {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Personal data form without GDPR mention",
            Severity::Medium,
            weight(cfg, "no_gdpr_mention", 8),
            "collects personal data without any data-protection disclosure",
        ));
    }

    if sensitive_hits > 0 && ctx.canonical.scheme == "http" {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Sensitive form over plaintext HTTP",
            Severity::Critical,
            weight(cfg, "sensitive_form_over_http", 15),
            "a sensitive-data form is served without TLS",
        ));
    }

    findings
}

fn weight(cfg: &AnalyzerConfig, key: &str, default: u32) -> u32 {
    cfg.check_weights.get(key).copied().unwrap_or(default)
}
