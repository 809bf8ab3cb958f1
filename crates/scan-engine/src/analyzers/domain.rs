//! Domain/WHOIS/TLD analyzer: registration age, risky TLDs, WHOIS privacy,
//! subdomain depth and brand doppelganger detection.

use once_cell::sync::Lazy;

use crate::config::AnalyzerConfig;

use super::{Finding, ScanContext, Severity};

const CATEGORY_ID: &str = "domain_whois_tld";

const HIGH_RISK_TLDS: &[&str] = &["tk", "ml", "ga", "cf", "gq", "xyz", "top", "work", "click"];
const MEDIUM_RISK_TLDS: &[&str] = &["info", "biz", "online", "site", "icu"];

pub(crate) static KNOWN_BRANDS: &[&str] = &[
    "paypal", "amazon", "microsoft", "apple", "google", "facebook", "netflix", "chase",
    "wellsfargo", "bankofamerica", "coinbase", "binance",
];

static QWERTY_ROWS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["qwertyuiop", "asdfghjkl", "zxcvbnm"]);

pub fn analyze(ctx: &ScanContext, cfg: &AnalyzerConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let host = &ctx.canonical.host;
    let registrable = &ctx.canonical.registrable_domain;

    // --- registration age ---
    if let Some(whois) = ctx.evidence.whois.as_ref() {
        if let Some(created) = whois.created_at {
            let age_days = (chrono::Utc::now() - created).num_days();
            if age_days <= 7 {
                findings.push(Finding::new(
                    CATEGORY_ID,
                    "Domain registered within the last week",
                    Severity::High,
                    weight(cfg, "age_le_7d", 15),
                    format!("registered {age_days} days ago"),
                ));
            } else if age_days <= 30 {
                findings.push(Finding::new(
                    CATEGORY_ID,
                    "Domain registered within the last month",
                    Severity::Medium,
                    weight(cfg, "age_le_30d", 8),
                    format!("registered {age_days} days ago"),
                ));
            } else if age_days <= 90 {
                findings.push(Finding::new(
                    CATEGORY_ID,
                    "Domain registered within the last quarter",
                    Severity::Low,
                    weight(cfg, "age_le_90d", 3),
                    format!("registered {age_days} days ago"),
                ));
            }
        }

        if whois.privacy_protected {
            findings.push(Finding::new(
                CATEGORY_ID,
                "WHOIS privacy protection enabled",
                Severity::Low,
                weight(cfg, "whois_privacy", 3),
                "registrant identity is masked",
            ));
        }

        if !whois.complete {
            findings.push(Finding::new(
                CATEGORY_ID,
                "Incomplete WHOIS record",
                Severity::Medium,
                weight(cfg, "whois_incomplete", 5),
                "registrar did not return a complete record",
            ));
        }
    }

    // --- TLD risk ---
    let tld = ctx.canonical.tld.rsplit('.').next().unwrap_or(&ctx.canonical.tld);
    if HIGH_RISK_TLDS.contains(&tld) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "High-risk top-level domain",
            Severity::Medium,
            weight(cfg, "tld_high_risk", 10),
            format!(".{tld} is disproportionately used for abuse"),
        ));
    } else if MEDIUM_RISK_TLDS.contains(&tld) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Medium-risk top-level domain",
            Severity::Low,
            weight(cfg, "tld_medium_risk", 5),
            format!(".{tld} has elevated abuse rates"),
        ));
    }

    // --- subdomain depth ---
    let labels: Vec<&str> = host.split('.').collect();
    let registrable_labels = registrable.split('.').count();
    let subdomain_depth = labels.len().saturating_sub(registrable_labels);
    if subdomain_depth >= 3 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Excessive subdomain depth",
            Severity::Low,
            weight(cfg, "subdomain_depth", 5),
            format!("{subdomain_depth} subdomain levels"),
        ));
    }

    // --- excessive digits / random-looking labels ---
    let leaf_label = labels.first().copied().unwrap_or_default();
    let digit_count = leaf_label.chars().filter(|c| c.is_ascii_digit()).count();
    if digit_count >= 4 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Label contains an unusual number of digits",
            Severity::Low,
            weight(cfg, "excessive_digits", 5),
            format!("{digit_count} digits in {leaf_label}"),
        ));
    }

    // --- brand doppelganger ---
    if let Some((brand, distance, normalized)) = closest_brand(registrable) {
        if distance > 0 && distance <= 2 {
            let detail = if single_char_swap(&normalized, brand).is_some_and(|(a, b)| qwerty_adjacent(a, b)) {
                format!("edit distance {distance} from \"{brand}\" via an adjacent-key substitution")
            } else {
                format!("edit distance {distance} from \"{brand}\"")
            };
            findings.push(Finding::new(
                CATEGORY_ID,
                "Domain resembles a well-known brand",
                Severity::Critical,
                weight(cfg, "brand_doppelganger", 20),
                detail,
            ));
        }
    }

    findings
}

fn weight(cfg: &AnalyzerConfig, key: &str, default: u32) -> u32 {
    cfg.check_weights.get(key).copied().unwrap_or(default)
}

/// Find the brand name with the smallest Levenshtein distance to the given
/// registrable domain's leading label, skipping exact matches (a brand's own
/// domain should never flag itself).
fn closest_brand(registrable_domain: &str) -> Option<(&'static str, usize, String)> {
    let label = registrable_domain.split('.').next().unwrap_or(registrable_domain);
    let normalized = decancer::cure!(label).ok()?.to_string();

    KNOWN_BRANDS
        .iter()
        .filter(|brand| **brand != normalized)
        .map(|brand| (*brand, levenshtein(&normalized, brand), normalized.clone()))
        .min_by_key(|(_, dist, _)| *dist)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (curr[j - 1] + 1).min(prev[j] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn qwerty_adjacent(a: char, b: char) -> bool {
    QWERTY_ROWS.iter().any(|row| {
        let chars: Vec<char> = row.chars().collect();
        if let (Some(ia), Some(ib)) = (chars.iter().position(|c| *c == a), chars.iter().position(|c| *c == b)) {
            ia.abs_diff(ib) == 1
        } else {
            false
        }
    })
}

/// If `a` and `b` are the same length and differ at exactly one position,
/// returns that pair of characters.
fn single_char_swap(a: &str, b: &str) -> Option<(char, char)> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len() != b.len() {
        return None;
    }
    let mut diffs = a.iter().zip(b.iter()).filter(|(x, y)| x != y);
    match (diffs.next(), diffs.next()) {
        (Some((&x, &y)), None) => Some((x, y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;
    use crate::evidence::EvidenceBundle;
    use crate::reachability::ReachabilityState;

    fn ctx<'a>(canonical: &'a crate::canonical::CanonicalUrl, evidence: &'a EvidenceBundle) -> ScanContext<'a> {
        ScanContext { canonical, evidence, reachability: ReachabilityState::Online }
    }

    #[test]
    fn flags_high_risk_tld() {
        let canonical = canonicalize("http://free-stuff.tk/").unwrap();
        let evidence = EvidenceBundle::default();
        let cfg = AnalyzerConfig { enabled: true, max_weight: 40, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ctx(&canonical, &evidence), &cfg);
        assert!(findings.iter().any(|f| f.title.contains("top-level domain")));
    }

    #[test]
    fn flags_brand_doppelganger() {
        let canonical = canonicalize("http://paypai.com/").unwrap();
        let evidence = EvidenceBundle::default();
        let cfg = AnalyzerConfig { enabled: true, max_weight: 40, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ctx(&canonical, &evidence), &cfg);
        assert!(findings.iter().any(|f| f.title.contains("brand")));
    }

    #[test]
    fn does_not_flag_the_real_brand() {
        let canonical = canonicalize("http://paypal.com/").unwrap();
        let evidence = EvidenceBundle::default();
        let cfg = AnalyzerConfig { enabled: true, max_weight: 40, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ctx(&canonical, &evidence), &cfg);
        assert!(!findings.iter().any(|f| f.title.contains("brand")));
    }

    #[test]
    fn flags_keyboard_adjacent_typo_doppelganger() {
        // "paypal" -> "paypak": l/k are adjacent on a QWERTY keyboard.
        let canonical = canonicalize("http://paypak.com/").unwrap();
        let evidence = EvidenceBundle::default();
        let cfg = AnalyzerConfig { enabled: true, max_weight: 40, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ctx(&canonical, &evidence), &cfg);
        let finding = findings.iter().find(|f| f.title.contains("brand")).expect("doppelganger finding");
        assert!(finding.description.contains("adjacent-key"));
    }

    #[test]
    fn qwerty_adjacent_rows() {
        assert!(qwerty_adjacent('a', 's'));
        assert!(!qwerty_adjacent('a', 'p'));
    }

    #[test]
    fn levenshtein_basic() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("paypal", "paypal"), 0);
    }
}
