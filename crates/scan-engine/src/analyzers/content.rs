//! Content analyzer: obfuscated scripts, suspicious external resources,
//! minimal/parking content and brand mismatch in page title.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalyzerConfig;

use super::domain::KNOWN_BRANDS;
use super::{Finding, ScanContext, Severity};

const CATEGORY_ID: &str = "content";

const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "verify your account",
    "confirm your identity",
    "unusual activity",
    "suspended",
    "update your payment",
    "your account will be locked",
    "click here immediately",
    "security alert",
];

static TITLE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

static SCRIPT_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<script[^>]*>(.*?)</script>").unwrap());

static JS_REDIRECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(window\.location(\.href)?\s*=|location\.replace\s*\(|location\.assign\s*\()").unwrap());

static OBFUSCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"eval\s*\(",
        r"document\.write\s*\(",
        r"fromCharCode",
        r"atob\s*\(",
        r"\\x[0-9a-fA-F]{2}",
        r"%u[0-9a-fA-F]{4}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

static PARKING_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(domain for sale|buy this domain|this domain is parked)").unwrap());

static META_REFRESH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<meta[^>]+http-equiv=["']?refresh["']?"#).unwrap());

static IFRAME_IP_OR_SHORTENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)src=["'](https?://(?:\d{1,3}\.){3}\d{1,3}|https?://(bit\.ly|tinyurl\.com|t\.co|goo\.gl))"#)
        .unwrap()
});

static BASE64_BLOB: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9+/]{200,}={0,2}").unwrap());

pub fn analyze(ctx: &ScanContext, cfg: &AnalyzerConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let Some(http) = ctx.evidence.http.as_ref() else {
        return findings;
    };
    let body = &http.body;

    if body.trim().len() < 100 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Minimal page content",
            Severity::Low,
            weight(cfg, "minimal_content", 5),
            format!("body is {} characters", body.trim().len()),
        ));
    }

    if PARKING_PATTERN.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Parking-page language detected",
            Severity::Medium,
            weight(cfg, "parking_phrase", 10),
            "body contains a domain-for-sale phrase",
        ));
    }

    let obfuscation_hits = OBFUSCATION_PATTERNS.iter().filter(|re| re.is_match(body)).count();
    if obfuscation_hits > 0 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Obfuscated script markers",
            Severity::High,
            weight(cfg, "obfuscation_markers", 15).min(obfuscation_hits as u32 * 5),
            format!("{obfuscation_hits} obfuscation marker(s) found"),
        ));
    }

    if BASE64_BLOB.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Large base64 blob in page",
            Severity::Medium,
            weight(cfg, "base64_blob", 8),
            "a >=200 char base64-looking blob was found in script content",
        ));
    }

    if META_REFRESH.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Meta-refresh redirect",
            Severity::Low,
            weight(cfg, "meta_refresh", 5),
            "page uses a meta refresh redirect",
        ));
    }

    if IFRAME_IP_OR_SHORTENER.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Suspicious external resource",
            Severity::Medium,
            weight(cfg, "suspicious_resource", 10),
            "an embedded resource points at a raw IP or known shortener",
        ));
    }

    let lower = body.to_ascii_lowercase();
    let keyword_hits: Vec<&str> =
        SUSPICIOUS_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).copied().collect();
    if !keyword_hits.is_empty() {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Suspicious urgency/account keywords",
            Severity::Medium,
            weight(cfg, "suspicious_keywords", 8).min(keyword_hits.len() as u32 * 4),
            format!("matched: {}", keyword_hits.join(", ")),
        ));
    }

    if let Some(brand) = title_brand_mismatch(body, &ctx.canonical.registrable_domain) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Page title names a brand the domain doesn't own",
            Severity::High,
            weight(cfg, "title_brand_mismatch", 15),
            format!("title references \"{brand}\" but the registrable domain is \"{}\"", ctx.canonical.registrable_domain),
        ));
    }

    let redirect_mechanism_hits: usize =
        SCRIPT_TAG.captures_iter(body).map(|c| JS_REDIRECT.find_iter(&c[1]).count()).sum();
    if redirect_mechanism_hits >= 2 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Multiple script-driven redirects",
            Severity::Medium,
            weight(cfg, "multiple_js_redirects", 10),
            format!("{redirect_mechanism_hits} location-changing statements in script content"),
        ));
    }

    if SCRIPT_TAG.captures_iter(body).any(|c| contains_foreign_script(&c[1])) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Foreign-language text embedded in script body",
            Severity::Low,
            weight(cfg, "foreign_script_text", 5),
            "script content contains non-Latin script ranges uncommon in legitimate page logic",
        ));
    }

    findings
}

/// Looks for a known brand name in the page `<title>` that isn't a
/// substring of the registrable domain, e.g. a title of "PayPal - Login"
/// served from `secure-paypai-verify.tk`.
fn title_brand_mismatch(body: &str, registrable_domain: &str) -> Option<&'static str> {
    let title = TITLE_TAG.captures(body)?.get(1)?.as_str().to_ascii_lowercase();
    let domain = registrable_domain.to_ascii_lowercase();
    KNOWN_BRANDS.iter().find(|brand| title.contains(*brand) && !domain.contains(*brand)).copied()
}

/// Cyrillic, CJK, Arabic and Hebrew ranges showing up inside `<script>`
/// bodies is a common sign of obfuscated/translated phishing kits reusing
/// a template built for a different audience.
fn contains_foreign_script(script: &str) -> bool {
    script.chars().any(|c| {
        let cp = c as u32;
        (0x0400..=0x04FF).contains(&cp) // Cyrillic
            || (0x0600..=0x06FF).contains(&cp) // Arabic
            || (0x0590..=0x05FF).contains(&cp) // Hebrew
            || (0x4E00..=0x9FFF).contains(&cp) // CJK Unified Ideographs
    })
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

    fn ctx_with_body(body: &str) -> (crate::canonical::CanonicalUrl, EvidenceBundle) {
        let canonical = canonicalize("http://example.com/").unwrap();
        let evidence = EvidenceBundle {
            http: Some(HttpEvidence {
                status: 200,
                headers: Default::default(),
                body: body.to_string(),
                redirect_chain: Vec::new(),
                final_url: "http://example.com/".to_string(),
            }),
            ..Default::default()
        };
        (canonical, evidence)
    }

    #[test]
    fn flags_obfuscation() {
        let (canonical, evidence) = ctx_with_body("<script>eval(atob('...'))</script>");
        let cfg = AnalyzerConfig { enabled: true, max_weight: 40, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("Obfuscated")));
    }

    #[test]
    fn flags_suspicious_keywords() {
        let (canonical, evidence) = ctx_with_body("Your account will be locked, please verify your account now.");
        let cfg = AnalyzerConfig { enabled: true, max_weight: 40, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("keyword")));
    }

    #[test]
    fn flags_title_brand_mismatch() {
        let (canonical, evidence) = ctx_with_body("<title>PayPal - Secure Login</title>");
        let cfg = AnalyzerConfig { enabled: true, max_weight: 40, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("brand")));
    }

    #[test]
    fn flags_multiple_js_redirects() {
        let (canonical, evidence) = ctx_with_body(
            "<script>window.location.href='http://a.test';location.replace('http://b.test');</script>",
        );
        let cfg = AnalyzerConfig { enabled: true, max_weight: 40, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("redirects")));
    }

    #[test]
    fn flags_foreign_script_text() {
        let (canonical, evidence) = ctx_with_body("<script>var x = 'привет мир';</script>");
        let cfg = AnalyzerConfig { enabled: true, max_weight: 40, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("Foreign-language")));
    }

    #[test]
    fn no_findings_without_http_evidence() {
        let canonical = canonicalize("http://example.com/").unwrap();
        let evidence = EvidenceBundle::default();
        let cfg = AnalyzerConfig { enabled: true, max_weight: 40, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.is_empty());
    }
}
