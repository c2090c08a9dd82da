//! Criterion benchmarks for the event-frame codec.
//!
//! Measures encode and decode latency for the frames a playback node handles
//! most often: the `showMedia` push and its two acknowledgment events.
//!
//! Run with:
//! ```bash
//! cargo bench --package show-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use show_core::protocol::{decode_frame, encode_frame, EventName, Frame};
use show_core::ShowEvent;

// ── Frame fixtures ────────────────────────────────────────────────────────────

fn make_show_media() -> Frame {
    Frame::event(
        EventName::ShowMedia,
        vec![json!({
            "mediaObject": {"_id": "5a1f00c2", "type": "video", "url": "http://media.local/intro.mp4"},
            "displayDuration": 10000
        })],
    )
}

fn make_media_done() -> Frame {
    Frame::event(EventName::MediaDone, vec![json!("5a1f00c2")])
}

fn make_scene_list_ack() -> Frame {
    let scenes: Vec<_> = (0..16)
        .map(|i| json!({"_id": format!("scene-{i}"), "name": format!("Scene {i}")}))
        .collect();
    Frame::ack(1, vec![serde_json::Value::Null, json!(scenes)])
}

fn all_frames() -> Vec<(&'static str, Frame)> {
    vec![
        ("show_media", make_show_media()),
        ("media_done", make_media_done()),
        ("scene_list_ack", make_scene_list_ack()),
    ]
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame");
    for (name, frame) in all_frames() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &frame, |b, frame| {
            b.iter(|| encode_frame(black_box(frame)).unwrap())
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_frame");
    for (name, frame) in all_frames() {
        let text = encode_frame(&frame).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &text, |b, text| {
            b.iter(|| decode_frame(black_box(text)).unwrap())
        });
    }
    group.finish();
}

fn bench_show_event_decode(c: &mut Criterion) {
    let Frame::Event { args, .. } = make_show_media() else {
        unreachable!("fixture is an event frame");
    };
    c.bench_function("show_event_from_args", |b| {
        b.iter(|| ShowEvent::from_args(black_box(&args)).unwrap())
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_show_event_decode);
criterion_main!(benches);
