//! Criterion benchmarks for the JSON line codec.
//!
//! Motion events dominate wire traffic (one per pointer delta per tick), so
//! encode/decode throughput for `mouse_event` is the number that matters.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tx2tx_core::domain::events::KeyEvent;
use tx2tx_core::domain::geometry::NormalizedPoint;
use tx2tx_core::protocol::codec::{decode_line, encode_line};
use tx2tx_core::protocol::messages::Message;

fn bench_encode_mouse_move(c: &mut Criterion) {
    let msg = Message::mouse_move_normalized(NormalizedPoint::new(0.9375, 0.5));
    c.bench_function("encode_mouse_move", |b| {
        b.iter(|| encode_line(black_box(&msg)).unwrap())
    });
}

fn bench_decode_mouse_move(c: &mut Criterion) {
    let line = encode_line(&Message::mouse_move_normalized(NormalizedPoint::new(
        0.9375, 0.5,
    )))
    .unwrap();
    let line = line.trim_end().to_string();
    c.bench_function("decode_mouse_move", |b| {
        b.iter(|| decode_line(black_box(&line)).unwrap())
    });
}

fn bench_encode_key_event(c: &mut Criterion) {
    let msg = Message::key_event(&KeyEvent::press(38, Some(0x61), Some(0x4)));
    c.bench_function("encode_key_event", |b| {
        b.iter(|| encode_line(black_box(&msg)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_encode_mouse_move,
    bench_decode_mouse_move,
    bench_encode_key_event
);
criterion_main!(benches);
