//! 필터 파이프라인 및 버퍼 벤치마크
//!
//! `send` 경로의 동기 구간(필터 합성)과 플러시 경로의 배치 추출 비용을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use logship_core::types::LogRecord;
use logship_shipper::{AddFields, DropFields, FilterPipeline, LOG_LIMIT, LogBuffer, QueueItem, map_filter};

fn sample_log() -> LogRecord {
    LogRecord::new()
        .with("timestamp", "2024-01-15T12:00:00.123456Z")
        .with("level", "info")
        .with("message", "request processed")
        .with("request_id", "550e8400-e29b-41d4-a716-446655440000")
        .with("duration_ms", 245)
        .with("password", "hunter2")
        .with("http", serde_json::json!({"method": "POST", "path": "/api/v1/orders", "status": 201}))
}

fn pipeline_with(filters: usize) -> FilterPipeline {
    let mut pipeline = FilterPipeline::new();
    for i in 0..filters {
        match i % 3 {
            0 => pipeline.add(AddFields::new([(format!("tag_{i}"), "v")])),
            1 => pipeline.add(DropFields::new(["password"])),
            _ => pipeline.add(map_filter(|log: LogRecord| log.with("host", "web-01"))),
        }
    }
    pipeline
}

fn bench_filter_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_pipeline");
    group.throughput(Throughput::Elements(1));

    for filters in [0usize, 1, 4, 16] {
        let pipeline = pipeline_with(filters);
        let log = sample_log();
        group.bench_with_input(BenchmarkId::from_parameter(filters), &filters, |b, _| {
            b.iter(|| pipeline.apply(black_box(log.clone())).unwrap())
        });
    }

    group.finish();
}

fn bench_buffer_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer");

    // 1000건 적재 후 LOG_LIMIT 단위로 모두 추출
    group.throughput(Throughput::Elements(1000));
    group.bench_function("push_and_drain_1000", |b| {
        let items: Vec<QueueItem> = (0..1000).map(|_| QueueItem::new(sample_log())).collect();
        b.iter(|| {
            let mut buffer = LogBuffer::new();
            for item in &items {
                buffer.push(item.clone());
            }
            while !buffer.is_empty() {
                black_box(buffer.drain_batch(LOG_LIMIT));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_filter_pipeline, bench_buffer_drain);
criterion_main!(benches);
