// Request scheduler.
//
// Owns the periodic segmentation trigger and the single-flight guard. A round
// is capture -> segment -> build mask -> publish; at most one round is ever
// outstanding, and a trigger that finds one in flight is skipped, not queued.
//
// The current mask lives in a `watch` channel: the scheduler is the only
// writer and replaces the whole `Arc<Mask>` at once, so readers see either
// the previous complete mask or the next one.

use crate::camera::FrameSource;
use crate::error::Error;
use crate::mask;
use crate::segment::Segmenter;
use crate::types::Mask;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Currently published mask. `None` means "no regions to tint".
pub type MaskSender = watch::Sender<Option<Arc<Mask>>>;
pub type MaskReceiver = watch::Receiver<Option<Arc<Mask>>>;

pub fn mask_channel() -> (MaskSender, MaskReceiver) {
    watch::channel(None)
}

/// Outcome of one finished round, reported after the guard is released.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    /// The service answered; `nails` is the number of usable polygons (0 clears the mask).
    Completed { nails: usize, latency: Duration },
    /// The round failed; the published mask was left untouched.
    Failed { error: Error, latency: Option<Duration> },
}

struct Shared {
    source: Arc<dyn FrameSource>,
    segmenter: Arc<dyn Segmenter>,
    masks: MaskSender,
    events: mpsc::UnboundedSender<RoundEvent>,
    in_flight: AtomicBool,
    runtime: Handle,
}

/// Held for the lifetime of one round; clears the in-flight flag on every exit path.
struct InFlight {
    shared: Arc<Shared>,
}

impl InFlight {
    fn acquire(shared: &Arc<Shared>) -> Option<Self> {
        shared
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { shared: shared.clone() })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.shared.in_flight.store(false, Ordering::Release);
    }
}

enum State {
    Idle,
    Running { interval: Duration, live: Arc<Mutex<bool>>, ticker: JoinHandle<()> },
}

pub struct Scheduler {
    shared: Arc<Shared>,
    state: State,
}

impl Scheduler {
    /// Build an idle scheduler. Round tasks and the trigger are spawned on `runtime`.
    pub fn new(
        source: Arc<dyn FrameSource>,
        segmenter: Arc<dyn Segmenter>,
        masks: MaskSender,
        events: mpsc::UnboundedSender<RoundEvent>,
        runtime: Handle,
    ) -> Self {
        let shared = Arc::new(Shared {
            source,
            segmenter,
            masks,
            events,
            in_flight: AtomicBool::new(false),
            runtime,
        });
        Self { shared, state: State::Idle }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    pub fn is_in_flight(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Period of the running trigger, if any.
    pub fn interval(&self) -> Option<Duration> {
        match &self.state {
            State::Running { interval, .. } => Some(*interval),
            State::Idle => None,
        }
    }

    /// Start periodic segmentation: one round now, then one every `interval`.
    /// No-op if already running.
    pub fn start(&mut self, interval: Duration) {
        if self.is_running() {
            debug!("Scheduler already running");
            return;
        }
        let interval = interval.max(Duration::from_millis(1));

        trigger(&self.shared);

        let live = Arc::new(Mutex::new(true));
        let ticker = {
            let shared = self.shared.clone();
            let live = live.clone();
            self.shared.runtime.spawn(async move {
                let mut ticks = time::interval_at(Instant::now() + interval, interval);
                ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticks.tick().await;
                    if !fire_tick(&shared, &live) {
                        break;
                    }
                }
            })
        };

        info!("Real-time segmentation started (every {}ms)", interval.as_millis());
        self.state = State::Running { interval, live, ticker };
    }

    /// Cancel the trigger. A round already in flight still completes and publishes,
    /// but no new periodic round starts once this returns.
    pub fn stop(&mut self) {
        if let State::Running { live, ticker, .. } = std::mem::replace(&mut self.state, State::Idle) {
            *live.lock() = false;
            ticker.abort();
            info!("Real-time segmentation stopped");
        }
    }

    /// Change the cadence. While running this restarts the trigger right away.
    pub fn set_interval(&mut self, interval: Duration) {
        if self.is_running() {
            self.stop();
            self.start(interval);
        }
    }

    /// One round outside the cadence. `None` if a round is already in flight.
    pub fn run_once(&self) -> Option<JoinHandle<RoundEvent>> {
        trigger(&self.shared)
    }

    /// Withdraw the published mask. A round still in flight may publish again.
    pub fn clear_mask(&self) {
        self.shared.masks.send_replace(None);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Claim the guard synchronously, then hand the round to the runtime.
fn trigger(shared: &Arc<Shared>) -> Option<JoinHandle<RoundEvent>> {
    match InFlight::acquire(shared) {
        Some(guard) => Some(shared.runtime.spawn(run_round(shared.clone(), guard))),
        None => {
            debug!("Skipping segmentation (previous still running)");
            None
        }
    }
}

/// One periodic tick. The flag is held across the trigger so `stop` cannot
/// interleave with it. Returns false once the ticker has been stopped.
fn fire_tick(shared: &Arc<Shared>, live: &Mutex<bool>) -> bool {
    let live = live.lock();
    if *live {
        trigger(shared);
    }
    *live
}

async fn run_round(shared: Arc<Shared>, guard: InFlight) -> RoundEvent {
    let event = match execute(&shared).await {
        Ok((nails, latency)) => RoundEvent::Completed { nails, latency },
        Err((error, latency)) => {
            warn!("Segmentation failed: {error}");
            RoundEvent::Failed { error, latency }
        }
    };
    drop(guard);

    // Receiver gone means the session is tearing down; nothing left to report to.
    let _ = shared.events.send(event.clone());
    event
}

async fn execute(shared: &Shared) -> Result<(usize, Duration), (Error, Option<Duration>)> {
    let frame = shared.source.capture().map_err(|e| (e, None))?;
    let (width, height) = (frame.width, frame.height);

    let submitted = Instant::now();
    let result = shared.segmenter.segment(frame).await;
    let latency = submitted.elapsed();
    let nails = result.map_err(|e| (e, Some(latency)))?;

    let count = nails.detected();
    if count == 0 {
        shared.masks.send_replace(None);
        info!("No nails detected ({}ms)", latency.as_millis());
    } else {
        let mask = mask::build_mask(&nails, width, height);
        shared.masks.send_replace(Some(Arc::new(mask)));
        info!("Detected {count} nails ({}ms)", latency.as_millis());
    }
    Ok((count, latency))
}
