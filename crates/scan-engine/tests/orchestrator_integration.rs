use scan_engine::{ScanEngine, ScanEngineConfig};

#[tokio::test]
async fn scans_a_benign_domain_with_low_risk() {
    let engine = ScanEngine::new(ScanEngineConfig::default());
    let verdict = engine.scan("http://example.com/").await.expect("scan should always return a verdict");

    assert!(verdict.max_score > 0);
    assert!(verdict.total_score <= verdict.max_score);
    assert_eq!(
        verdict.categories.iter().map(|c| c.score).sum::<u32>() + verdict.ti_score,
        verdict.total_score
    );
}

#[tokio::test]
async fn every_category_score_is_bounded_by_its_max_weight() {
    let engine = ScanEngine::new(ScanEngineConfig::default());
    let verdict = engine.scan("http://suspicious-test-domain.tk/login").await.unwrap();

    for category in &verdict.categories {
        assert!(category.score <= category.max_weight, "{} exceeded its max weight", category.category_id);
    }
}

#[tokio::test]
async fn rejects_unsupported_scheme_without_panicking() {
    let engine = ScanEngine::new(ScanEngineConfig::default());
    let result = engine.scan("ftp://example.com/file").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn identical_urls_share_a_fingerprint() {
    let engine = ScanEngine::new(ScanEngineConfig::default());
    let a = engine.scan("http://example.com/a?x=1&y=2").await.unwrap();
    let b = engine.scan("http://example.com/a?y=2&x=1").await.unwrap();
    assert_eq!(a.canonical.fingerprint_hash, b.canonical.fingerprint_hash);
}
