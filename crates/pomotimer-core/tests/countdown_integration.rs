//! Countdown engine driven by its tokio task, on a paused clock.
//!
//! With `start_paused` the runtime jumps straight to the next pending timer
//! whenever every task is idle, so wake-ups land exactly on their deadlines.
//! `tokio::time::advance` moves the clock in one jump, which is how these
//! tests simulate a suspended or starved scheduler.

use std::time::Duration;

use pomotimer_core::timer::{self, TimerHandle};
use pomotimer_core::{TimerError, TimerEvent, TimerEventKind, TimerSnapshot};
use tokio::sync::broadcast;
use tokio::time::Instant;

fn snapshot(remaining_secs: u64, running: bool, paused: bool) -> TimerSnapshot {
    TimerSnapshot {
        remaining_secs,
        running,
        paused,
    }
}

/// Start and wait until the engine task has applied it.
async fn start_synced(timer: &TimerHandle, secs: u64) {
    timer.start(secs).unwrap();
    timer.snapshot().await.unwrap();
}

fn drain(events: &mut broadcast::Receiver<TimerEvent>) -> Vec<(TimerEventKind, u64)> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push((event.kind, event.remaining_secs));
    }
    out
}

#[tokio::test(start_paused = true)]
async fn counts_down_at_one_second_cadence_and_completes() {
    let timer = timer::spawn();
    let mut events = timer.subscribe();
    let t0 = Instant::now();

    timer.start(3).unwrap();

    let mut seen = Vec::new();
    loop {
        let event = events.recv().await.unwrap();
        seen.push((event.kind, event.remaining_secs));
        if event.kind == TimerEventKind::Completed {
            assert!(!event.running);
            assert!(!event.paused);
            break;
        }
    }

    assert_eq!(
        seen,
        vec![
            (TimerEventKind::Started, 3),
            (TimerEventKind::Tick, 2),
            (TimerEventKind::Tick, 1),
            (TimerEventKind::Tick, 0),
            (TimerEventKind::Completed, 0),
        ]
    );
    assert_eq!(Instant::now() - t0, Duration::from_secs(3));
    assert_eq!(timer.snapshot().await.unwrap(), snapshot(0, false, false));
}

#[tokio::test(start_paused = true)]
async fn single_second_completes_without_negative_tick() {
    let timer = timer::spawn();
    let mut events = timer.subscribe();

    timer.start(1).unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    timer.snapshot().await.unwrap();

    assert_eq!(
        drain(&mut events),
        vec![
            (TimerEventKind::Started, 1),
            (TimerEventKind::Tick, 0),
            (TimerEventKind::Completed, 0),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stall_is_corrected_by_the_next_wake_up() {
    let timer = timer::spawn();
    let mut events = timer.subscribe();
    start_synced(&timer, 60).await;

    tokio::time::advance(Duration::from_millis(10_250)).await;
    assert_eq!(timer.snapshot().await.unwrap(), snapshot(50, true, false));

    // One wake-up accounts for the whole stall.
    assert_eq!(
        drain(&mut events),
        vec![(TimerEventKind::Started, 60), (TimerEventKind::Tick, 50)]
    );

    // Cadence continues from the original origin.
    tokio::time::sleep(Duration::from_millis(750)).await;
    assert_eq!(timer.snapshot().await.unwrap().remaining_secs, 49);
}

#[tokio::test(start_paused = true)]
async fn elapsed_seconds_match_decrement() {
    let timer = timer::spawn();
    start_synced(&timer, 600).await;

    for (step_ms, expected) in [(400, 600), (700, 599), (5_900, 593), (1_000, 592)] {
        tokio::time::advance(Duration::from_millis(step_ms)).await;
        assert_eq!(timer.snapshot().await.unwrap().remaining_secs, expected);
    }
}

#[tokio::test(start_paused = true)]
async fn stall_beyond_the_end_completes_once() {
    let timer = timer::spawn();
    let mut events = timer.subscribe();
    start_synced(&timer, 5).await;

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(timer.snapshot().await.unwrap(), snapshot(0, false, false));
    assert_eq!(
        drain(&mut events),
        vec![
            (TimerEventKind::Started, 5),
            (TimerEventKind::Tick, 0),
            (TimerEventKind::Completed, 0),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_do_not_consume_time() {
    let timer = timer::spawn();
    start_synced(&timer, 30).await;

    for _ in 0..3 {
        timer.pause().unwrap();
        timer.resume().unwrap();
    }
    timer.start(30).unwrap();
    assert_eq!(timer.snapshot().await.unwrap(), snapshot(30, true, false));
}

#[tokio::test(start_paused = true)]
async fn time_spent_paused_is_not_counted() {
    let timer = timer::spawn();
    start_synced(&timer, 30).await;

    tokio::time::advance(Duration::from_secs(2)).await;
    timer.pause().unwrap();
    assert_eq!(timer.snapshot().await.unwrap(), snapshot(28, false, true));

    tokio::time::advance(Duration::from_secs(60)).await;
    assert_eq!(timer.snapshot().await.unwrap(), snapshot(28, false, true));

    timer.resume().unwrap();
    timer.snapshot().await.unwrap();
    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(timer.snapshot().await.unwrap(), snapshot(27, true, false));
}

#[tokio::test(start_paused = true)]
async fn pausing_twice_equals_pausing_once() {
    let timer = timer::spawn();
    let mut events = timer.subscribe();
    start_synced(&timer, 30).await;

    timer.pause().unwrap();
    let once = timer.snapshot().await.unwrap();
    timer.pause().unwrap();
    let twice = timer.snapshot().await.unwrap();

    assert_eq!(once, twice);
    let paused_events = drain(&mut events)
        .into_iter()
        .filter(|(kind, _)| *kind == TimerEventKind::Paused)
        .count();
    assert_eq!(paused_events, 1);
}

#[tokio::test(start_paused = true)]
async fn resume_when_not_paused_is_ignored() {
    let timer = timer::spawn();
    let mut events = timer.subscribe();

    timer.reset(10).unwrap();
    timer.resume().unwrap();
    assert_eq!(timer.snapshot().await.unwrap(), snapshot(10, false, false));
    assert_eq!(drain(&mut events), vec![(TimerEventKind::Reset, 10)]);
}

#[tokio::test(start_paused = true)]
async fn reset_then_query() {
    let timer = timer::spawn();
    start_synced(&timer, 100).await;
    tokio::time::advance(Duration::from_secs(3)).await;

    timer.reset(42).unwrap();
    assert_eq!(timer.snapshot().await.unwrap(), snapshot(42, false, false));

    // No wake-up survives the reset.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(timer.snapshot().await.unwrap(), snapshot(42, false, false));
}

#[tokio::test(start_paused = true)]
async fn stop_zeroes_remaining_time() {
    let timer = timer::spawn();
    timer.start(1500).unwrap();
    timer.stop().unwrap();
    assert_eq!(timer.snapshot().await.unwrap(), snapshot(0, false, false));
}

#[tokio::test(start_paused = true)]
async fn zero_duration_is_rejected_synchronously() {
    let timer = timer::spawn_with_remaining(90);
    let mut events = timer.subscribe();

    assert_eq!(
        timer.start(0),
        Err(TimerError::InvalidDuration { secs: 0 })
    );
    assert_eq!(
        timer.reset(0),
        Err(TimerError::InvalidDuration { secs: 0 })
    );
    assert_eq!(timer.snapshot().await.unwrap(), snapshot(90, false, false));
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn repeated_starts_keep_a_single_wake_up() {
    let timer = timer::spawn();
    let mut events = timer.subscribe();

    for _ in 0..5 {
        timer.start(10).unwrap();
    }
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(timer.snapshot().await.unwrap().remaining_secs, 7);

    let ticks = drain(&mut events)
        .into_iter()
        .filter(|(kind, _)| *kind == TimerEventKind::Tick)
        .count();
    assert_eq!(ticks, 3);
}

#[tokio::test(start_paused = true)]
async fn watch_channel_follows_events() {
    let timer = timer::spawn();
    let mut watch = timer.watch();
    start_synced(&timer, 5).await;
    assert_eq!(timer.latest(), snapshot(5, true, false));

    watch.borrow_and_update();
    watch.changed().await.unwrap();
    assert_eq!(*watch.borrow(), snapshot(4, true, false));
}

#[tokio::test(start_paused = true)]
async fn handles_fail_after_shutdown() {
    let timer = timer::spawn();
    timer.shutdown().unwrap();
    assert_eq!(timer.snapshot().await, Err(TimerError::Disconnected));
    tokio::task::yield_now().await;
    assert_eq!(timer.start(10), Err(TimerError::Disconnected));
}
