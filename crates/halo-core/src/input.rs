//! Pointer, wheel and scroll tracking.
//!
//! Event handlers only *write* into the tracker; the animation driver calls
//! [`InputTracker::sample`] once per tick, which coalesces every event that
//! arrived since the previous tick into one [`InputState`] snapshot.

use crate::camera::clamp_range;
use crate::constants::*;
use glam::Vec2;

/// Per-tick snapshot of pointer/scroll state read by layers and the camera rig.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputState {
    /// Pointer position in normalized device coordinates, always in [-1, 1].
    pub pointer_ndc: Vec2,
    /// Smoothed pointer speed.
    pub pointer_velocity: f32,
    /// Decayed pointer "energy" in [0, influence_cap].
    pub influence: f32,
    /// Scroll progress in [0, 1].
    pub scroll_normalized: f32,
    /// Wheel-integrated zoom target, clamped to the camera's distance range.
    pub camera_distance: f32,
    /// NDC displacement accumulated while the pointer was held this tick.
    pub drag_delta: Vec2,
    pub pointer_down: bool,
}

impl InputState {
    fn resting(camera_distance: f32) -> Self {
        Self {
            pointer_ndc: Vec2::ZERO,
            pointer_velocity: 0.0,
            influence: 0.0,
            scroll_normalized: 0.0,
            camera_distance,
            drag_delta: Vec2::ZERO,
            pointer_down: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TrackerParams {
    pub velocity_scale: f32,
    pub velocity_smoothing: f32,
    pub influence_gain: f32,
    pub influence_cap: f32,
    pub influence_decay_per_sec: f32,
    pub epsilon: f32,
    pub scroll_span_px: f32,
    pub wheel_sensitivity: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub start_distance: f32,
    pub enable_pointer: bool,
    pub enable_scroll: bool,
}

impl TrackerParams {
    /// `start_distance` inside the zoom range; used whenever input returns to rest.
    pub fn resting_distance(&self) -> f32 {
        let lo = self.min_distance.min(self.max_distance);
        let hi = self.min_distance.max(self.max_distance);
        clamp_range(self.start_distance, lo, hi)
    }
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            velocity_scale: POINTER_VELOCITY_SCALE,
            velocity_smoothing: POINTER_VELOCITY_SMOOTHING,
            influence_gain: INFLUENCE_GAIN,
            influence_cap: INFLUENCE_CAP,
            influence_decay_per_sec: INFLUENCE_DECAY_PER_SEC,
            epsilon: INFLUENCE_EPSILON,
            scroll_span_px: SCROLL_NORMALIZE_SPAN_PX,
            wheel_sensitivity: CAMERA_WHEEL_SENSITIVITY,
            min_distance: CAMERA_MIN_DISTANCE,
            max_distance: CAMERA_MAX_DISTANCE,
            start_distance: CAMERA_START_DISTANCE,
            enable_pointer: true,
            enable_scroll: true,
        }
    }
}

/// Convert a client-space pixel position into NDC.
///
/// Returns `None` for a degenerate viewport (hidden tab, collapsed container)
/// so callers keep their last known state instead of dividing by zero.
#[inline]
pub fn client_to_ndc(client_x: f32, client_y: f32, width: f32, height: f32) -> Option<Vec2> {
    if !(width > 0.0 && height > 0.0) {
        return None;
    }
    let x = (client_x / width) * 2.0 - 1.0;
    let y = -(client_y / height) * 2.0 + 1.0;
    Some(Vec2::new(x, y))
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub struct InputTracker {
    params: TrackerParams,
    viewport: Vec2,
    state: InputState,
    // written by event handlers, consumed by `sample`
    pending_pointer: Option<Vec2>,
    pending_wheel: f32,
    pending_scroll: Option<f32>,
    pending_drag: Vec2,
    last_sampled_pointer: Vec2,
    anomalies: u32,
    live: bool,
}

impl InputTracker {
    /// Start tracking for one mounted scene.
    pub fn init(params: TrackerParams, width: f32, height: f32) -> Self {
        let start = params.resting_distance();
        Self {
            params,
            viewport: Vec2::new(width, height),
            state: InputState::resting(start),
            pending_pointer: None,
            pending_wheel: 0.0,
            pending_scroll: None,
            pending_drag: Vec2::ZERO,
            last_sampled_pointer: Vec2::ZERO,
            anomalies: 0,
            live: true,
        }
    }

    /// Stop tracking; later events are ignored and state returns to rest.
    pub fn dispose(&mut self) {
        self.live = false;
        self.pending_pointer = None;
        self.pending_wheel = 0.0;
        self.pending_scroll = None;
        self.pending_drag = Vec2::ZERO;
        self.state = InputState::resting(self.params.resting_distance());
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    pub fn state(&self) -> InputState {
        self.state
    }

    /// Number of clamped or discarded pointer samples since `init`.
    pub fn anomalies(&self) -> u32 {
        self.anomalies
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.viewport = Vec2::new(width, height);
        }
    }

    pub fn on_pointer_move(&mut self, client_x: f32, client_y: f32) {
        if !self.live || !self.params.enable_pointer {
            return;
        }
        if !client_x.is_finite() || !client_y.is_finite() {
            self.note_anomaly("non-finite pointer sample");
            return;
        }
        let Some(ndc) = client_to_ndc(client_x, client_y, self.viewport.x, self.viewport.y) else {
            return;
        };
        let clamped = ndc.clamp(Vec2::splat(-1.0), Vec2::splat(1.0));
        if clamped != ndc {
            self.note_anomaly("pointer outside viewport");
        }
        if self.state.pointer_down {
            let from = self.pending_pointer.unwrap_or(self.state.pointer_ndc);
            self.pending_drag += clamped - from;
        }
        self.pending_pointer = Some(clamped);
    }

    pub fn on_pointer_down(&mut self) {
        if self.live && self.params.enable_pointer {
            self.state.pointer_down = true;
        }
    }

    pub fn on_pointer_up(&mut self) {
        self.state.pointer_down = false;
    }

    pub fn on_wheel(&mut self, delta_y: f32) {
        if !self.live || !delta_y.is_finite() {
            return;
        }
        self.pending_wheel += delta_y;
    }

    pub fn on_scroll(&mut self, scroll_y: f32) {
        if !self.live || !self.params.enable_scroll || !scroll_y.is_finite() {
            return;
        }
        self.pending_scroll = Some(scroll_y);
    }

    /// Fold every event received since the last tick into a new snapshot.
    pub fn sample(&mut self, dt_sec: f32) -> InputState {
        if !self.live {
            return self.state;
        }
        let p = self.params;
        let dt = dt_sec.max(0.0);

        let travelled = match self.pending_pointer.take() {
            Some(ndc) => {
                self.state.pointer_ndc = ndc;
                let d = (ndc - self.last_sampled_pointer).length();
                self.last_sampled_pointer = ndc;
                d
            }
            None => 0.0,
        };

        if travelled > 0.0 {
            let raw = travelled * p.velocity_scale;
            self.state.pointer_velocity = lerp(self.state.pointer_velocity, raw, p.velocity_smoothing);
            self.state.influence =
                (self.state.pointer_velocity * p.influence_gain).clamp(0.0, p.influence_cap);
        } else {
            self.state.pointer_velocity = lerp(self.state.pointer_velocity, 0.0, p.velocity_smoothing);
            let k = (p.influence_decay_per_sec * dt).clamp(0.0, 1.0);
            self.state.influence = lerp(self.state.influence, 0.0, k);
        }
        if self.state.pointer_velocity < p.epsilon {
            self.state.pointer_velocity = 0.0;
        }
        if self.state.influence < p.epsilon {
            self.state.influence = 0.0;
        }

        if self.pending_wheel != 0.0 {
            let target = self.state.camera_distance + self.pending_wheel * p.wheel_sensitivity;
            let (lo, hi) = (p.min_distance.min(p.max_distance), p.min_distance.max(p.max_distance));
            self.state.camera_distance = clamp_range(target, lo, hi);
            self.pending_wheel = 0.0;
        }

        if let Some(scroll_y) = self.pending_scroll.take() {
            let span = p.scroll_span_px.max(1.0);
            self.state.scroll_normalized = (scroll_y / span).clamp(0.0, 1.0);
        }

        self.state.drag_delta = std::mem::take(&mut self.pending_drag);
        self.state
    }

    fn note_anomaly(&mut self, what: &str) {
        self.anomalies = self.anomalies.saturating_add(1);
        log::debug!("[input] {} (total {})", what, self.anomalies);
    }
}
