use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scan_engine::intel::store::IndicatorStore;
use scan_engine::intel::{IndicatorType, Severity, ThreatIndicator};

fn seed(store: &IndicatorStore, count: usize) {
    let batch: Vec<ThreatIndicator> = (0..count)
        .map(|i| ThreatIndicator {
            id: format!("id-{i}"),
            indicator_type: IndicatorType::Domain,
            value: format!("evil-{i}.example"),
            value_hash: format!("hash-{i}"),
            threat_type: "malware".to_string(),
            severity: Severity::High,
            confidence: 90.0,
            source_id: "bench-source".to_string(),
            first_seen: Utc::now(),
            last_seen: Utc::now(),
            expires_at: None,
            active: true,
            metadata: Default::default(),
        })
        .collect();
    store.upsert_batch("bench-source", batch);
}

fn bench_lookup(c: &mut Criterion) {
    let store = IndicatorStore::new();
    seed(&store, 200_000);

    c.bench_function("lookup_hit", |b| {
        b.iter(|| black_box(store.lookup(IndicatorType::Domain, "hash-100000")))
    });

    c.bench_function("lookup_miss", |b| {
        b.iter(|| black_box(store.lookup(IndicatorType::Domain, "hash-not-present")))
    });
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
