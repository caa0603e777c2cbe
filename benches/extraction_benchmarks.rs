//! Performance benchmarks for unsubscriber components.
//!
//! These benchmarks measure link extraction, domain classification and the
//! allowlist split over batches of synthetic messages, the hot path of every
//! sweep.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::{Value, json};

use unsubscriber::classify::{self, Allowlist};
use unsubscriber::extract::{self, BodyEncoding, Extractor};
use unsubscriber::facade::{SweepOptions, Sweeper};

const SAMPLE_BODY: &str = "Thanks for reading our newsletter!\n\
    Manage preferences at https://news.example.co.uk/prefs?u=42 or\n\
    unsubscribe here: https://click.mailer.example.com/unsubscribe?id=abc123&list=7\n\
    Follow us https://social.example.org/brand";

/// A realistic message with a header link, a text part and an attachment
fn sample_message(i: usize, encoding: BodyEncoding) -> Value {
    let data = match encoding {
        BodyEncoding::Plain => SAMPLE_BODY.to_string(),
        BodyEncoding::Base64Url => URL_SAFE_NO_PAD.encode(SAMPLE_BODY),
    };
    json!({
        "id": format!("m{i}"),
        "payload": {
            "headers": [
                {"name": "From", "value": "News <news@example.com>"},
                {"name": "Subject", "value": format!("Issue #{i}")},
                {"name": "List-Unsubscribe",
                 "value": format!("<mailto:unsub@sender{i}.com>, <https://sender{}.com/u/{i}>", i % 20)}
            ],
            "parts": [
                {"mimeType": "text/plain", "body": {"data": data}},
                {"mimeType": "image/png", "body": {"attachmentId": "x"}}
            ]
        }
    })
}

fn batch(n: usize, encoding: BodyEncoding) -> Vec<Value> {
    (0..n).map(|i| sample_message(i, encoding)).collect()
}

/// Benchmark single-message extraction
fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");

    let plain = sample_message(1, BodyEncoding::Plain);
    group.bench_function("plain_message", |b| {
        let extractor = Extractor::new(BodyEncoding::Plain);
        b.iter(|| black_box(extractor.extract(black_box(&plain))))
    });

    let encoded = sample_message(1, BodyEncoding::Base64Url);
    group.bench_function("base64url_message", |b| {
        let extractor = Extractor::new(BodyEncoding::Base64Url);
        b.iter(|| black_box(extractor.extract(black_box(&encoded))))
    });

    group.bench_function("header_links", |b| {
        let value = "<mailto:a@b.com>, <https://x.com/u?id=1>, <https://y.org/unsubscribe>";
        b.iter(|| black_box(extract::header_links(black_box(value)).count()))
    });

    group.finish();
}

/// Benchmark registrable-domain classification
fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");

    let urls: Vec<String> = (0..100)
        .map(|i| match i % 4 {
            0 => format!("https://mail{i}.example.co.uk/unsubscribe"),
            1 => format!("https://sender{i}.com/u"),
            2 => format!("http://10.0.0.{}/u", i % 255),
            _ => format!("https://a.b.c{i}.github.io/x"),
        })
        .collect();

    group.throughput(Throughput::Elements(urls.len() as u64));
    group.bench_function("classify_100", |b| {
        b.iter(|| black_box(classify::classify(black_box(&urls))))
    });

    let classified = classify::classify(&urls).links;
    let allowlist = Allowlist::new(["example.co.uk", "github.io", "sender5.com"]);
    group.bench_function("filter_100", |b| {
        b.iter(|| black_box(classify::filter(black_box(&classified), &allowlist)))
    });

    group.finish();
}

/// Benchmark the whole offline pipeline at different batch sizes
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    for &size in &[10usize, 150, 500] {
        let messages = batch(size, BodyEncoding::Plain);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("classify_batch", size), &messages, |b, messages| {
            let extractor = Extractor::default();
            let opts = SweepOptions::default();
            b.iter(|| {
                let per_message = extract::extract_all(&extractor, messages.iter());
                black_box(Sweeper::classify_batch(&per_message, &opts))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_extraction, bench_classification, bench_pipeline);

criterion_main!(benches);
