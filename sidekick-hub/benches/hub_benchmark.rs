use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use serde_json::json;
use sidekick_core::{AnnouncePayload, Message, PeerRole, PeerStatus};
use sidekick_hub::{Hub, OfflineQueue};

fn bench_relay_fan_out(c: &mut Criterion) {
    let mut hub = Hub::new();
    let (hero, _hero_rx) = hub.connect();
    let mut receivers: Vec<_> = (0..100).map(|_| hub.connect().1).collect();

    let frame = Message::update("grid", "g1", "setColor", json!({"x": 1, "y": 1, "color": "red"}))
        .encode()
        .unwrap();

    let mut group = c.benchmark_group("Hub");
    group.throughput(Throughput::Elements(100));
    group.bench_function("relay_to_100_peers", |b| {
        b.iter(|| {
            hub.handle_frame(hero, black_box(&frame));
            for rx in &mut receivers {
                while rx.try_recv().is_ok() {}
            }
        })
    });
    group.finish();
}

fn bench_presence_announce(c: &mut Criterion) {
    c.bench_function("announce_with_10_online", |b| {
        b.iter_batched(
            || {
                let mut hub = Hub::new();
                let mut keep = Vec::new();
                for i in 0..10 {
                    let (conn, rx) = hub.connect();
                    let announce = AnnouncePayload::now(format!("sidekick-{i}"), PeerRole::Sidekick, PeerStatus::Online, "bench");
                    hub.handle_frame(conn, &Message::announce(&announce).encode().unwrap());
                    keep.push(rx);
                }
                let (hero, rx) = hub.connect();
                keep.push(rx);
                let frame = Message::announce(&AnnouncePayload::now("hero", PeerRole::Hero, PeerStatus::Online, "bench"))
                    .encode()
                    .unwrap();
                (hub, hero, frame, keep)
            },
            |(mut hub, hero, frame, keep)| {
                hub.handle_frame(hero, black_box(&frame));
                black_box(keep)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_offline_queue(c: &mut Criterion) {
    let message = Message::spawn("label", "l1", json!({"text": "queued"}));

    c.bench_function("offline_queue_1k_enqueue_drain", |b| {
        b.iter(|| {
            let mut queue = OfflineQueue::new(10_000);
            for _ in 0..1000 {
                queue.enqueue(message.clone());
            }
            black_box(queue.drain())
        })
    });
}

criterion_group!(benches, bench_relay_fan_out, bench_presence_announce, bench_offline_queue);
criterion_main!(benches);
