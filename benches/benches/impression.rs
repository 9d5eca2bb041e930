// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::time::Duration;

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use kurbo::{Rect, Size};
use understory_impression::{ImpressionConfig, ImpressionLedger, ManualClock, ScanPolicy};
use understory_impression_tokio::{ImpressionTracker, TrackerConfig};

const VIEWPORT: Rect = Rect::new(0.0, 0.0, 400.0, 800.0);
const CARD: Size = Size::new(400.0, 100.0);

fn card_bounds(index: u32, scroll: f64) -> Rect {
    let top = f64::from(index) * 100.0 - scroll;
    Rect::new(0.0, top, 400.0, top + 100.0)
}

/// Tracks `n` keys, all started at time zero.
fn tracking_ledger(n: u32, policy: ScanPolicy) -> ImpressionLedger<u32> {
    let mut ledger = ImpressionLedger::new(ImpressionConfig::default().with_scan_policy(policy));
    for key in 0..n {
        ledger.on_geometry_update(key, CARD, card_bounds(0, 0.0), VIEWPORT, Duration::ZERO);
    }
    ledger
}

fn bench_geometry_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("impression/geometry_update");
    for &n in &[64_u32, 1024] {
        // One frame of a scrolling list: a window of cards is visible, the
        // rest are disposed.
        group.bench_with_input(BenchmarkId::new("scroll_frame", n), &n, |b, &n| {
            let mut ledger = ImpressionLedger::new(ImpressionConfig::default());
            let mut scroll = 0.0;
            b.iter(|| {
                scroll = (scroll + 7.0) % (f64::from(n) * 100.0);
                for key in 0..n {
                    black_box(ledger.on_geometry_update(
                        key,
                        CARD,
                        card_bounds(key, scroll),
                        VIEWPORT,
                        Duration::ZERO,
                    ));
                }
            });
        });
    }
    group.finish();
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("impression/tick");
    for &n in &[64_u32, 1024] {
        for (name, policy) in [("prefix", ScanPolicy::Prefix), ("full", ScanPolicy::Full)] {
            let all_due = BenchmarkId::new(format!("{name}/all_due"), n);
            group.bench_with_input(all_due, &n, |b, &n| {
                b.iter_batched(
                    || tracking_ledger(n, policy),
                    |mut ledger| black_box(ledger.tick(Duration::from_secs(1))),
                    BatchSize::SmallInput,
                );
            });
            let none_due = BenchmarkId::new(format!("{name}/none_due"), n);
            group.bench_with_input(none_due, &n, |b, &n| {
                let mut ledger = tracking_ledger(n, policy);
                b.iter(|| black_box(ledger.tick(Duration::from_millis(10))));
            });
        }
    }
    group.finish();
}

fn bench_tracker_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("impression/tracker");
    let n = 256_u32;
    group.bench_function("locked_scroll_frame/256", |b| {
        let tracker =
            ImpressionTracker::<u32>::with_clock(TrackerConfig::default(), ManualClock::new())
                .expect("default config is valid");
        let mut scroll = 0.0;
        b.iter(|| {
            scroll = (scroll + 7.0) % (f64::from(n) * 100.0);
            for key in 0..n {
                black_box(tracker.on_geometry_update(
                    key,
                    CARD,
                    card_bounds(key, scroll),
                    VIEWPORT,
                ));
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_geometry_updates,
    bench_tick,
    bench_tracker_updates
);
criterion_main!(benches);
