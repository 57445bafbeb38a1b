//! Performance benchmarks for round fan-out, selection and rendering
//!
//! Probes go through an in-memory transport so the numbers reflect the
//! coordinator's own overhead: task spawning, channel delivery and logging.

use async_trait::async_trait;
use cdn_latency_probe::{
    logging::{LogLevel, Logger, ProbeLogger},
    report::render_round,
    AppError, Endpoint, EndpointCatalog, EndpointSelector, ProbeCoordinator, ProbeTransport, Result,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;

/// Answers immediately; every tenth endpoint fails
struct InstantTransport;

#[async_trait]
impl ProbeTransport for InstantTransport {
    async fn fetch(&self, url: &str) -> Result<usize> {
        if url.contains("://down") {
            Err(AppError::network("connection refused"))
        } else {
            Ok(10 * 1024)
        }
    }
}

fn endpoints(count: u32) -> Vec<Endpoint> {
    (0..count)
        .map(|i| {
            let host = if i % 10 == 0 { "down" } else { "node" };
            let base = format!("https://{}{}.example/metadata/", host, i);
            Endpoint::with_base(i, "n", "node", base.as_str()).unwrap()
        })
        .collect()
}

fn quiet_coordinator() -> ProbeCoordinator {
    let (logger, _buffer) = Logger::buffered("PROBE", LogLevel::Error);
    ProbeCoordinator::new(Arc::new(InstantTransport), ProbeLogger::from_logger(logger))
}

fn benchmark_round_fan_out(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let coordinator = quiet_coordinator();
    let mut group = c.benchmark_group("round_fan_out");

    for count in [3u32, 16, 64, 256] {
        let endpoints = endpoints(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &endpoints, |b, endpoints| {
            b.iter(|| {
                runtime.block_on(async {
                    let round = coordinator
                        .run_round(endpoints, Duration::from_secs(5), |result| {
                            black_box(result);
                        })
                        .await;
                    black_box(round.fastest().map(|r| r.endpoint.id))
                })
            })
        });
    }

    group.finish();
}

fn benchmark_selection(c: &mut Criterion) {
    let (logger, _buffer) = Logger::buffered("SELECT", LogLevel::Error);
    let selector = EndpointSelector::new(Arc::new(EndpointCatalog::builtin())).with_logger(logger);

    c.bench_function("select_and_read", |b| {
        let mut id = 0u32;
        b.iter(|| {
            id = (id + 1) % 5;
            black_box(selector.select(black_box(id)));
            black_box(selector.current())
        })
    });
}

fn benchmark_render_round(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let coordinator = quiet_coordinator();
    let round = runtime.block_on(coordinator.run_round(&endpoints(64), Duration::from_secs(5), |_| {}));

    c.bench_function("render_round_64", |b| {
        b.iter(|| black_box(render_round(black_box(&round), false)))
    });
}

criterion_group!(
    benches,
    benchmark_round_fan_out,
    benchmark_selection,
    benchmark_render_round
);

criterion_main!(benches);
