use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use fancast_tonic_core::proto::Note;
use tokio::runtime::Builder;

// The bench exercises the in-process hot paths directly: raw append
// throughput on the shared log, and a full submit-to-deliver round trip
// through a single dispatcher. Transport framing is deliberately excluded.
#[path = "../src/server/mod.rs"]
mod server;

use server::log::MessageLog;
use server::streaming::dispatcher::run_subscription;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn note(i: usize) -> Note {
    Note {
        sender: "bench".to_string(),
        content: format!("m{i}"),
    }
}

fn append_bench(c: &mut Criterion) {
    const BATCH: usize = 10_000;

    let mut group = c.benchmark_group("log");
    group.throughput(Throughput::Elements(BATCH as u64));
    group.bench_function("append_10k", |b| {
        b.iter(|| {
            let log = MessageLog::new();
            for i in 0..BATCH {
                black_box(log.append(note(i)));
            }
        });
    });
    group.finish();
}

fn fanout_bench(c: &mut Criterion) {
    const BATCH: usize = 10_000;

    let rt = Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    let mut group = c.benchmark_group("fanout");
    group.throughput(Throughput::Elements(BATCH as u64));
    group.bench_function("single_subscriber_10k", |b| {
        b.to_async(&rt).iter(|| async {
            let log = Arc::new(MessageLog::new());
            let shutdown = CancellationToken::new();
            let (tx, mut rx) = tokio::sync::mpsc::channel(64);

            let handle = tokio::spawn(run_subscription(
                Arc::clone(&log),
                0,
                tx,
                shutdown.clone(),
            ));

            for i in 0..BATCH {
                log.append(note(i));
            }
            for _ in 0..BATCH {
                black_box(rx.recv().await.unwrap().unwrap());
            }

            shutdown.cancel();
            drop(rx);
            let _ = handle.await;
        });
    });
    group.finish();
}

criterion_group!(benches, append_bench, fanout_bench);
criterion_main!(benches);
