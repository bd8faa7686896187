//! Heartbeat codec benchmarks
//!
//! Run with: cargo bench --bench codec

use ciborium::value::Value;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use coap_heartbeat::heartbeat::{build_request, decode_response, encode_request};

fn response_body(extra_keys: usize) -> Vec<u8> {
    let mut entries = vec![
        (
            Value::Text("desired_firmware".into()),
            Value::Integer(101.into()),
        ),
        (
            Value::Text("checkin_interval".into()),
            Value::Integer(3600.into()),
        ),
    ];
    for i in 0..extra_keys {
        entries.push((
            Value::Text(format!("extra_{}", i)),
            Value::Integer((i as i64).into()),
        ));
    }
    let mut buf = Vec::new();
    ciborium::into_writer(&Value::Map(entries), &mut buf).unwrap();
    buf
}

fn benchmark_encode_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("heartbeat_codec");
    group.throughput(Throughput::Elements(1));

    group.bench_function("encode_request", |b| {
        b.iter(|| {
            let request = build_request(black_box(1001), black_box(100));
            encode_request(&request).unwrap()
        });
    });

    group.finish();
}

fn benchmark_decode_response(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_response");

    for extra in [0usize, 8, 64].iter() {
        let body = response_body(*extra);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(format!("{}_extra_keys", extra), &body, |b, body| {
            b.iter(|| decode_response(black_box(body)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_encode_request, benchmark_decode_response);
criterion_main!(benches);
