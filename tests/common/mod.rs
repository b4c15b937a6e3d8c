#![allow(dead_code)]

use async_trait::async_trait;
use nail_preview::camera::FrameSlot;
use nail_preview::error::Error;
use nail_preview::scheduler::{self, MaskReceiver, RoundEvent, Scheduler};
use nail_preview::segment::Segmenter;
use nail_preview::types::{FrameBuffer, NailSet, Polygon};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, mpsc};

pub const WIDTH: usize = 100;
pub const HEIGHT: usize = 100;

/// Segmenter that replays a script and can hold every call at a gate.
pub struct ScriptedSegmenter {
    script: Mutex<VecDeque<Result<NailSet, Error>>>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedSegmenter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Segmenter for ScriptedSegmenter {
    async fn segment(&self, frame: FrameBuffer) -> Result<NailSet, Error> {
        assert_eq!((frame.width, frame.height), (WIDTH, HEIGHT));
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.script.lock().pop_front().unwrap_or_else(|| Ok(NailSet::default()))
    }
}

pub struct Harness {
    pub segmenter: Arc<ScriptedSegmenter>,
    pub gate: Arc<Semaphore>,
    pub masks: MaskReceiver,
    pub events: mpsc::UnboundedReceiver<RoundEvent>,
    pub scheduler: Scheduler,
}

impl Harness {
    /// Calls return immediately.
    pub fn open(script: Vec<Result<NailSet, Error>>) -> Self {
        Self::build(script, false)
    }

    /// Every call waits for one permit on `gate`.
    pub fn gated(script: Vec<Result<NailSet, Error>>) -> Self {
        Self::build(script, true)
    }

    fn build(script: Vec<Result<NailSet, Error>>, gated: bool) -> Self {
        let gate = Arc::new(Semaphore::new(0));
        let segmenter = Arc::new(ScriptedSegmenter {
            script: Mutex::new(script.into()),
            gate: gated.then(|| gate.clone()),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        });

        let slot = Arc::new(FrameSlot::new());
        slot.publish(FrameBuffer::blank(WIDTH, HEIGHT));

        let (mask_tx, masks) = scheduler::mask_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(slot, segmenter.clone(), mask_tx, event_tx, Handle::current());
        Self { segmenter, gate, masks, events, scheduler }
    }

    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub async fn next_event(&mut self) -> RoundEvent {
        self.events.recv().await.expect("event channel closed")
    }
}

pub fn square(x0: f32, y0: f32, x1: f32, y1: f32) -> Polygon {
    Polygon::from_flat(&[x0, y0, x1, y0, x1, y1, x0, y1]).unwrap()
}

pub fn one_square() -> NailSet {
    NailSet::from_polygons(vec![square(10.0, 10.0, 50.0, 50.0)])
}

pub fn two_squares() -> NailSet {
    NailSet::from_polygons(vec![square(10.0, 10.0, 50.0, 50.0), square(60.0, 60.0, 90.0, 90.0)])
}

pub fn overloaded() -> Error {
    Error::Service { status: 500, body: "model overloaded".to_string() }
}
