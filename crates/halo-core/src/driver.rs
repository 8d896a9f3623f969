//! Frame clock and the per-tick update order.

use crate::backend::GpuBackend;
use crate::composer::Scene;
use crate::constants::MAX_FRAME_DT;
use crate::error::FxResult;
use crate::input::{InputState, InputTracker};

/// Monotonic scene clock fed by display timestamps (milliseconds).
///
/// Elapsed time only moves forward: backwards or non-finite timestamps count
/// as a zero-length frame, and long gaps (background tabs) are capped at
/// `max_dt` so animations resume instead of jumping.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    elapsed: f64,
    last_ms: Option<f64>,
    max_dt: f32,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(MAX_FRAME_DT)
    }
}

impl Clock {
    pub fn new(max_dt: f32) -> Self {
        Self {
            elapsed: 0.0,
            last_ms: None,
            max_dt: max_dt.max(0.0),
        }
    }

    /// Advance to `now_ms`; returns the clamped step in seconds.
    pub fn advance(&mut self, now_ms: f64) -> f32 {
        if !now_ms.is_finite() {
            return 0.0;
        }
        let dt = match self.last_ms {
            Some(prev) => ((now_ms - prev) / 1000.0).clamp(0.0, self.max_dt as f64) as f32,
            None => 0.0,
        };
        // keep the newest timestamp even when it went backwards
        self.last_ms = Some(match self.last_ms {
            Some(prev) => prev.max(now_ms),
            None => now_ms,
        });
        self.elapsed += dt as f64;
        dt
    }

    /// Seconds since the first tick.
    pub fn elapsed(&self) -> f32 {
        self.elapsed as f32
    }
}

/// Result of one driver tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub dt: f32,
    pub time: f32,
    pub input: InputState,
    pub frame: u64,
}

/// Runs the tick sequence: clock, input sample, layer updates, flush, render.
#[derive(Debug, Default)]
pub struct AnimationDriver {
    clock: Clock,
    frames: u64,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self { clock, frames: 0 }
    }

    pub fn elapsed(&self) -> f32 {
        self.clock.elapsed()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// One frame. Every uniform and attribute write completes before the
    /// backend sees the frame plan.
    pub fn tick(
        &mut self,
        now_ms: f64,
        tracker: &mut InputTracker,
        scene: &mut Scene,
        backend: &mut dyn GpuBackend,
    ) -> FxResult<TickReport> {
        let dt = self.clock.advance(now_ms);
        let time = self.clock.elapsed();
        let input = tracker.sample(dt);
        scene.update(dt, time, &input);
        scene.flush(backend);
        scene.render(backend, time)?;
        self.frames += 1;
        if self.frames % 600 == 0 {
            log::debug!("[driver] frame {} t={:.1}s", self.frames, time);
        }
        Ok(TickReport {
            dt,
            time,
            input,
            frame: self.frames,
        })
    }
}
