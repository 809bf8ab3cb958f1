//! Financial Fraud analyzer: insecure payment forms, crypto-scam phrasing
//! and payment-processor impersonation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalyzerConfig;

use super::{Finding, ScanContext, Severity};

const CATEGORY_ID: &str = "financial_fraud";

static PAYMENT_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)name=["']?(card.?number|cvv|expir(y|ation))"#).unwrap());
static RECOGNIZED_PROCESSOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(stripe|paypal|braintree|adyen|square)\.(com|js)").unwrap());
static CRYPTO_WALLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\b[13][a-km-zA-HJ-NP-Z1-9]{25,34}\b|\b0x[a-fA-F0-9]{40}\b)").unwrap()
});
static CRYPTO_SCAM_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(double your (bitcoin|crypto|btc|eth)|send .{0,20}(btc|eth).{0,20}receive)").unwrap());
static INVESTMENT_FRAUD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(guaranteed (profit|returns)|risk.?free investment|triple your money)").unwrap());
static WIRE_TRANSFER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(wire transfer (only|required)|send cash|western union)").unwrap());

const PAYMENT_BRANDS: &[&str] = &["paypal", "stripe", "visa", "mastercard"];

pub fn analyze(ctx: &ScanContext, cfg: &AnalyzerConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let Some(http) = ctx.evidence.http.as_ref() else {
        return findings;
    };
    let body = &http.body;
    let lower = body.to_lowercase();

    let has_payment_field = PAYMENT_FIELD.is_match(body);
    if has_payment_field && ctx.canonical.scheme == "http" {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Payment form served over plaintext HTTP",
            Severity::Critical,
            weight(cfg, "payment_over_http", 15),
            "a card-number/cvv field is present without TLS",
        ));
    }

    if has_payment_field && !RECOGNIZED_PROCESSOR.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Payment form without a recognized processor",
            Severity::High,
            weight(cfg, "unrecognized_processor", 10),
            "no known payment-processor script/domain reference found alongside a payment field",
        ));
    }

    if CRYPTO_SCAM_PHRASE.is_match(body) && CRYPTO_WALLET.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Cryptocurrency scam pattern",
            Severity::Critical,
            weight(cfg, "crypto_scam", 15),
            "page combines a wallet address with a doubling/giveaway phrase",
        ));
    }

    if INVESTMENT_FRAUD.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Investment fraud language",
            Severity::High,
            weight(cfg, "investment_fraud", 10),
            "page promises guaranteed or risk-free returns",
        ));
    }

    if WIRE_TRANSFER.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Wire-transfer / cash-only payment request",
            Severity::Medium,
            weight(cfg, "wire_transfer_request", 8),
            "page asks for wire transfer or cash payment only",
        ));
    }

    let brand_mentioned = PAYMENT_BRANDS.iter().any(|b| lower.contains(b));
    let is_brand_domain = PAYMENT_BRANDS.iter().any(|b| ctx.canonical.registrable_domain.contains(b));
    if brand_mentioned && !is_brand_domain && has_payment_field {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Payment processor impersonation",
            Severity::Critical,
            weight(cfg, "processor_impersonation", 15),
            "references a payment brand on an unaffiliated domain with an active payment form",
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
    fn flags_payment_over_http() {
        let canonical = canonicalize("http://example.com/checkout").unwrap();
        let body = r#"<input name="card_number"><input name="cvv">"#;
        let evidence = EvidenceBundle {
            http: Some(HttpEvidence { status: 200, headers: Default::default(), body: body.to_string(), redirect_chain: Vec::new(), final_url: String::new() }),
            ..Default::default()
        };
        let cfg = AnalyzerConfig { enabled: true, max_weight: 25, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("plaintext HTTP")));
    }
}
