//! Criterion benchmarks for docseek.
//!
//! - Text analysis
//! - Committing documents into the index
//! - Query parsing and evaluation
//! - Snapshot persistence

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use docseek::analysis::analyzer::{Analyzer, StandardAnalyzer};
use docseek::document::NewDocument;
use docseek::index::IndexStore;
use docseek::ingest::{Extractor, HtmlExtractor};
use docseek::query::{QueryEngine, QueryParser, evaluate};
use tempfile::TempDir;

const WORDS: &[&str] = &[
    "segment", "source", "destination", "tracking", "audience", "profile", "event", "api",
    "warehouse", "identity", "pipeline", "schema", "consent", "journey", "attribute", "sync",
    "webhook", "batch", "stream", "replay", "mapping", "filter", "transform", "debugger",
];

/// Generate test passages for benchmarking.
fn generate_passages(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let len = 12 + (i % 40);
            (0..len)
                .map(|j| WORDS[(i * 7 + j * 13) % WORDS.len()]) // Pseudo-random distribution
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn populated_store(passages: &[String]) -> Arc<IndexStore> {
    let analyzer = Arc::new(StandardAnalyzer::new().unwrap());
    let store = Arc::new(IndexStore::open_in_memory(analyzer).unwrap());
    let mut txn = store.begin_write().unwrap();
    for (i, passage) in passages.iter().enumerate() {
        txn.add_document(NewDocument::new(format!("docs/{}", i / 20), passage.as_str()))
            .unwrap();
    }
    txn.commit().unwrap();
    store
}

/// Benchmark text analysis.
fn bench_text_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_analysis");

    let analyzer = StandardAnalyzer::new().unwrap();
    let texts = generate_passages(100);

    group.throughput(Throughput::Elements(100));
    group.bench_function("analyze_terms_batch", |b| {
        b.iter(|| {
            for text in &texts {
                black_box(analyzer.analyze_terms(black_box(text)).unwrap());
            }
        })
    });

    let html = texts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("<h1>Title {i}</h1><h2>Section</h2><p>{text}</p>"))
        .collect::<String>();
    let extractor = HtmlExtractor::new().unwrap();
    group.bench_function("extract_html_page", |b| {
        b.iter(|| black_box(extractor.extract(black_box(&html)).unwrap()))
    });

    group.finish();
}

/// Benchmark commits into an in-memory index.
fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit");
    group.sample_size(20);

    let passages = generate_passages(1000);
    let store = populated_store(&passages);

    for batch in [10usize, 100] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::new("replace_source", batch), &batch, |b, &batch| {
            b.iter(|| {
                let mut txn = store.begin_write().unwrap();
                for passage in passages.iter().take(batch) {
                    txn.add_document(NewDocument::new("docs/bench", passage.as_str()))
                        .unwrap();
                }
                black_box(txn.commit().unwrap())
            })
        });
    }

    group.finish();
}

/// Benchmark query parsing and evaluation.
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    let passages = generate_passages(5000);
    let store = populated_store(&passages);
    let engine = QueryEngine::new(store.clone());
    let parser = QueryParser::new(store.analyzer().clone());
    let snapshot = store.read_snapshot();

    let queries = [
        ("term", "segment"),
        ("and", "segment tracking"),
        ("or", "webhook OR replay OR consent"),
        ("not", "audience -profile"),
        ("phrase", "\"segment source\""),
    ];

    for (name, query_str) in queries {
        let query = parser.parse(query_str).unwrap();
        group.bench_function(BenchmarkId::new("evaluate", name), |b| {
            b.iter(|| black_box(evaluate(&snapshot, black_box(&query), 5).unwrap()))
        });
    }

    group.bench_function("parse_and_search", |b| {
        b.iter(|| black_box(engine.search(black_box("segment (tracking OR api)"), 5).unwrap()))
    });

    group.finish();
}

/// Benchmark persisting snapshots to disk.
fn bench_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("persistence");
    group.sample_size(10);

    let passages = generate_passages(2000);
    let dir = TempDir::new().unwrap();
    let analyzer = Arc::new(StandardAnalyzer::new().unwrap());
    let store = IndexStore::open_in_dir(dir.path(), analyzer.clone()).unwrap();
    let mut txn = store.begin_write().unwrap();
    for (i, passage) in passages.iter().enumerate() {
        txn.add_document(NewDocument::new(format!("docs/{}", i / 20), passage.as_str()))
            .unwrap();
    }
    txn.commit().unwrap();

    group.bench_function("commit_one_source", |b| {
        b.iter(|| {
            let mut txn = store.begin_write().unwrap();
            txn.add_document(NewDocument::new("docs/bench", passages[0].as_str()))
                .unwrap();
            black_box(txn.commit().unwrap())
        })
    });

    group.bench_function("open_existing", |b| {
        b.iter(|| black_box(IndexStore::open_in_dir(dir.path(), analyzer.clone()).unwrap()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_text_analysis,
    bench_commit,
    bench_search,
    bench_persistence
);
criterion_main!(benches);
