//! Benchmarks for webhook signature verification.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use payments::webhook::{DEFAULT_TOLERANCE_SECS, WebhookEvent, sign_payload, verify_signature};

const SECRET: &str = "whsec_bench_secret";
const NOW: i64 = 1_735_689_600;

fn delivery(metadata_keys: usize) -> Vec<u8> {
    let metadata: serde_json::Map<String, serde_json::Value> = (0..metadata_keys)
        .map(|i| (format!("key_{i}"), serde_json::Value::String(format!("value_{i}"))))
        .collect();

    serde_json::to_vec(&serde_json::json!({
        "id": "evt_bench",
        "type": "payment_intent.succeeded",
        "created": NOW,
        "data": { "object": { "id": "pi_bench", "metadata": metadata } }
    }))
    .unwrap()
}

fn bench_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify_signature");

    for keys in [3, 50, 500] {
        let payload = delivery(keys);
        let header = sign_payload(&payload, SECRET, NOW);
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, _| {
            b.iter(|| {
                verify_signature(&payload, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let payload = delivery(3);
    c.bench_function("parse_event", |b| {
        b.iter(|| WebhookEvent::parse(&payload).unwrap().metadata())
    });
}

criterion_group!(benches, bench_verify, bench_parse);
criterion_main!(benches);
