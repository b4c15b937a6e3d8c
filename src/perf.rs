// Read-only performance counters: render rate, average render time, API latency.
// Nothing here feeds back into scheduling or rendering.

use crate::scheduler::RoundEvent;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How many recent render durations the moving average covers.
pub const RENDER_WINDOW: usize = 30;
const FPS_WINDOW: Duration = Duration::from_secs(1);

pub struct PerfMonitor {
    window_start: Instant,
    frames_this_window: u32,
    fps: f32,
    render_times: VecDeque<Duration>,
    api_latency: Option<Duration>,
    last_round_failed: bool,
    nail_count: Option<usize>,
}

impl PerfMonitor {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames_this_window: 0,
            fps: 0.0,
            render_times: VecDeque::with_capacity(RENDER_WINDOW),
            api_latency: None,
            last_round_failed: false,
            nail_count: None,
        }
    }

    /// Count one render tick finishing at `now` that took `render`.
    pub fn record_tick(&mut self, now: Instant, render: Duration) {
        self.frames_this_window += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= FPS_WINDOW {
            self.fps = self.frames_this_window as f32 / elapsed.as_secs_f32();
            self.frames_this_window = 0;
            self.window_start = now;
        }

        if self.render_times.len() == RENDER_WINDOW {
            self.render_times.pop_front();
        }
        self.render_times.push_back(render);
    }

    pub fn record_round(&mut self, event: &RoundEvent) {
        match event {
            RoundEvent::Completed { nails, latency } => {
                self.api_latency = Some(*latency);
                self.last_round_failed = false;
                self.nail_count = Some(*nails);
            }
            RoundEvent::Failed { latency, .. } => {
                if let Some(latency) = latency {
                    self.api_latency = Some(*latency);
                }
                self.last_round_failed = true;
            }
        }
    }

    /// Ticks per second over the last completed ~1s window.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Mean of the last `RENDER_WINDOW` render durations, in milliseconds.
    pub fn avg_render_ms(&self) -> f32 {
        if self.render_times.is_empty() {
            return 0.0;
        }
        let total: Duration = self.render_times.iter().sum();
        total.as_secs_f32() * 1000.0 / self.render_times.len() as f32
    }

    pub fn api_latency(&self) -> Option<Duration> {
        self.api_latency
    }

    pub fn nail_count(&self) -> Option<usize> {
        self.nail_count
    }

    pub fn api_latency_text(&self) -> String {
        match (self.last_round_failed, self.api_latency) {
            (true, _) => "ERROR".to_string(),
            (false, Some(l)) => format!("{}MS", l.as_millis()),
            (false, None) => "-".to_string(),
        }
    }

    /// One HUD line with every stat.
    pub fn summary(&self) -> String {
        let nails = self.nail_count.map_or_else(|| "-".to_string(), |n| n.to_string());
        format!(
            "FPS: {:.0} | RENDER: {:.1}MS | API: {} | NAILS: {}",
            self.fps,
            self.avg_render_ms(),
            self.api_latency_text(),
            nails
        )
    }
}
