mod common;

use common::*;
use nail_preview::error::Error;
use nail_preview::mask::build_mask;
use nail_preview::scheduler::RoundEvent;
use nail_preview::types::{NailSet, Polygon};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::{self, Instant};

#[tokio::test(start_paused = true)]
async fn periodic_and_manual_triggers_never_overlap() {
    let mut h = Harness::gated(vec![Ok(one_square()), Ok(two_squares())]);

    h.scheduler.start(Duration::from_millis(50));
    assert!(h.scheduler.is_in_flight(), "first round starts immediately");

    // Ten periods pass with the first round stuck; every trigger is skipped.
    for _ in 0..10 {
        time::sleep(Duration::from_millis(50)).await;
        assert!(h.scheduler.run_once().is_none());
    }
    assert_eq!(h.segmenter.calls(), 1);

    h.release(1);
    assert!(matches!(h.next_event().await, RoundEvent::Completed { nails: 1, .. }));

    // The cadence resumes on its own after the slow round.
    h.release(1);
    assert!(matches!(h.next_event().await, RoundEvent::Completed { nails: 2, .. }));

    assert!(h.segmenter.calls() >= 2);
    assert_eq!(h.segmenter.max_active(), 1);
}

#[tokio::test]
async fn failed_round_keeps_last_known_good_mask() {
    let h = Harness::open(vec![Ok(one_square()), Err(overloaded())]);

    h.scheduler.run_once().unwrap().await.unwrap();
    let before = h.masks.borrow().clone().expect("mask published");

    let event = h.scheduler.run_once().unwrap().await.unwrap();
    assert!(matches!(event, RoundEvent::Failed { error: Error::Service { status: 500, .. }, .. }));

    let after = h.masks.borrow().clone().expect("mask still published");
    assert!(Arc::ptr_eq(&before, &after));
    assert!(!h.scheduler.is_in_flight());
}

#[tokio::test]
async fn empty_result_clears_while_failure_does_not() {
    let mut h = Harness::open(vec![
        Ok(one_square()),
        Ok(NailSet::default()),
        Ok(one_square()),
        Err(Error::Transport("connection refused".into())),
    ]);

    h.scheduler.run_once().unwrap().await.unwrap();
    assert!(h.masks.borrow().is_some());

    let cleared = h.scheduler.run_once().unwrap().await.unwrap();
    assert!(matches!(cleared, RoundEvent::Completed { nails: 0, .. }));
    assert!(h.masks.borrow().is_none());

    h.scheduler.run_once().unwrap().await.unwrap();
    let failed = h.scheduler.run_once().unwrap().await.unwrap();
    assert!(matches!(failed, RoundEvent::Failed { error: Error::Transport(_), .. }));
    assert!(h.masks.borrow().is_some());

    // Events arrive in round order.
    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(h.next_event().await);
    }
    assert!(matches!(seen[1], RoundEvent::Completed { nails: 0, .. }));
    assert!(matches!(seen[3], RoundEvent::Failed { .. }));
}

#[tokio::test]
async fn degenerate_only_result_behaves_like_empty() {
    let degenerate = NailSet::from_polygons(vec![Polygon::from_flat(&[10.0, 10.0, 50.0, 50.0]).unwrap()]);
    let h = Harness::open(vec![Ok(one_square()), Ok(degenerate)]);

    h.scheduler.run_once().unwrap().await.unwrap();
    let event = h.scheduler.run_once().unwrap().await.unwrap();
    assert!(matches!(event, RoundEvent::Completed { nails: 0, .. }));
    assert!(h.masks.borrow().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn readers_only_ever_see_complete_masks() {
    let mut script = Vec::new();
    for i in 0..40 {
        script.push(Ok(if i % 2 == 0 { one_square() } else { two_squares() }));
    }
    let h = Harness::open(script);

    let expected = [build_mask(&one_square(), WIDTH, HEIGHT), build_mask(&two_squares(), WIDTH, HEIGHT)];
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let masks = h.masks.clone();
        let done = done.clone();
        std::thread::spawn(move || {
            let mut samples = 0usize;
            while !done.load(Ordering::Acquire) {
                if let Some(m) = masks.borrow().clone() {
                    assert!(*m == expected[0] || *m == expected[1], "partially built mask observed");
                    samples += 1;
                }
            }
            samples
        })
    };

    for _ in 0..40 {
        h.scheduler.run_once().unwrap().await.unwrap();
    }
    done.store(true, Ordering::Release);
    let samples = reader.join().unwrap();
    assert!(samples > 0);
}

#[tokio::test(start_paused = true)]
async fn service_error_round_is_contained_and_cadence_continues() {
    let mut h = Harness::open(vec![Err(overloaded()), Ok(one_square())]);
    let started = Instant::now();

    h.scheduler.start(Duration::from_millis(100));
    let first = h.next_event().await;
    assert_eq!(first, RoundEvent::Failed { error: overloaded(), latency: Some(Duration::ZERO) });
    assert!(!h.scheduler.is_in_flight());
    assert!(h.masks.borrow().is_none());

    let second = h.next_event().await;
    assert!(matches!(second, RoundEvent::Completed { nails: 1, .. }));
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(100) && waited < Duration::from_millis(150), "{waited:?}");
    assert!(h.masks.borrow().is_some());
}

#[tokio::test(start_paused = true)]
async fn set_interval_takes_effect_immediately() {
    let mut h = Harness::open(vec![]);

    h.scheduler.start(Duration::from_secs(10));
    h.next_event().await;

    let changed = Instant::now();
    h.scheduler.set_interval(Duration::from_millis(100));
    assert_eq!(h.scheduler.interval(), Some(Duration::from_millis(100)));

    // Restart fires a round right away, then the new period applies.
    h.next_event().await;
    assert_eq!(changed.elapsed(), Duration::ZERO);
    h.next_event().await;
    assert!(changed.elapsed() < Duration::from_secs(1));
    assert_eq!(h.segmenter.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn set_interval_during_a_round_does_not_overlap() {
    let mut h = Harness::gated(vec![]);

    h.scheduler.start(Duration::from_secs(10));
    assert!(h.scheduler.is_in_flight());

    h.scheduler.set_interval(Duration::from_millis(50));
    h.scheduler.set_interval(Duration::from_millis(20));
    time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.segmenter.calls(), 1);

    h.release(2);
    h.next_event().await;
    h.next_event().await;
    assert_eq!(h.segmenter.max_active(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_trigger_but_lets_round_finish() {
    let mut h = Harness::gated(vec![Ok(one_square())]);

    h.scheduler.start(Duration::from_millis(50));
    assert!(h.scheduler.is_in_flight());
    h.scheduler.stop();
    assert!(!h.scheduler.is_running());

    h.release(1);
    assert!(matches!(h.next_event().await, RoundEvent::Completed { nails: 1, .. }));
    assert!(h.masks.borrow().is_some(), "result of the in-flight round is still applied");

    h.release(10);
    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.segmenter.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn restart_after_stop_runs_again() {
    let mut h = Harness::open(vec![]);

    h.scheduler.start(Duration::from_millis(30));
    h.next_event().await;
    h.scheduler.stop();
    time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.segmenter.calls(), 1);

    h.scheduler.start(Duration::from_millis(30));
    h.next_event().await;
    assert_eq!(h.segmenter.calls(), 2);
}
