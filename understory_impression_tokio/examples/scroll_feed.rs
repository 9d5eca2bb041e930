// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated scrolling feed.
//!
//! A column of cards scrolls past a fixed viewport. Each card reports its
//! layout every frame, and the tracker announces the cards that stayed at
//! least half visible for the configured dwell.
//!
//! Run with `RUST_LOG=understory_impression_tokio=debug` to see the tracker's
//! own log output.

use std::time::Duration;

use kurbo::{Rect, Size};
use tracing::info;
use tracing_subscriber::EnvFilter;
use understory_impression_tokio::{ElementBinding, ImpressionTracker, TrackerConfig, TrackerError};

const CARD_COUNT: u32 = 12;
const CARD_HEIGHT: f64 = 120.0;
const VIEWPORT: Rect = Rect::new(0.0, 0.0, 360.0, 480.0);
const FRAME: Duration = Duration::from_millis(16);
const SCROLL_PER_FRAME: f64 = 2.0;

fn card_bounds(index: u32, scroll: f64) -> Rect {
    let top = f64::from(index) * CARD_HEIGHT - scroll;
    Rect::new(0.0, top, VIEWPORT.width(), top + CARD_HEIGHT)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), TrackerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = TrackerConfig::default()
        .with_dwell(Duration::from_millis(800))
        .with_check_interval(Duration::from_millis(200));
    let tracker = ImpressionTracker::<u32>::new(config)?;

    let mut impressions = tracker.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(impression) = impressions.recv().await {
            info!(
                card = impression.key,
                tick = impression.iteration,
                "impression"
            );
        }
    });

    let cards: Vec<ElementBinding<u32>> = (0..CARD_COUNT).map(|i| tracker.bind(i)).collect();
    let size = Size::new(VIEWPORT.width(), CARD_HEIGHT);
    let max_scroll = f64::from(CARD_COUNT) * CARD_HEIGHT - VIEWPORT.height();

    tracker.start()?;
    let mut frames = tokio::time::interval(FRAME);
    let mut scroll = 0.0;
    while scroll <= max_scroll {
        frames.tick().await;
        for (index, card) in (0..).zip(&cards) {
            card.update(size, card_bounds(index, scroll), VIEWPORT);
        }
        scroll += SCROLL_PER_FRAME;
    }

    // Let the last visible cards finish their dwell.
    tokio::time::sleep(config.impression.dwell + config.check_interval).await;
    tracker.stop();

    let info = tracker.debug_info();
    info!(
        confirmed = info.confirmed,
        tracking = info.tracking,
        "feed finished"
    );

    drop(cards);
    drop(tracker);
    let _ = printer.await;
    Ok(())
}
