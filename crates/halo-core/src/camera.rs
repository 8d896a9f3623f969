//! Orbit camera driven by drag and wheel input.

use crate::constants::*;
use crate::input::InputState;
use glam::{Mat4, Vec3};

/// Right-handed perspective camera.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect: f32,
    pub fovy_radians: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_radians, self.aspect, self.znear, self.zfar)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraParams {
    pub min_distance: f32,
    pub max_distance: f32,
    pub start_distance: f32,
    /// Polar angle measured from +Y, radians.
    pub min_polar: f32,
    pub max_polar: f32,
    pub start_polar: f32,
    pub start_orbit: f32,
    /// Fraction of the remaining gap closed each tick, in [0, 1].
    pub damping: f32,
    pub drag_sensitivity: f32,
    pub fovy_radians: f32,
    pub znear: f32,
    pub zfar: f32,
    pub target: Vec3,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            min_distance: CAMERA_MIN_DISTANCE,
            max_distance: CAMERA_MAX_DISTANCE,
            start_distance: CAMERA_START_DISTANCE,
            min_polar: CAMERA_MIN_POLAR,
            max_polar: CAMERA_MAX_POLAR,
            start_polar: CAMERA_START_POLAR,
            start_orbit: 0.0,
            damping: CAMERA_DAMPING,
            drag_sensitivity: CAMERA_DRAG_SENSITIVITY,
            fovy_radians: CAMERA_FOVY_RADIANS,
            znear: CAMERA_ZNEAR,
            zfar: CAMERA_ZFAR,
            target: Vec3::ZERO,
        }
    }
}

/// Smoothed orbit/dolly state.
///
/// `distance` and `polar_angle` are clamped after every mutation, so no input
/// sequence can push them out of range.
#[derive(Clone, Debug)]
pub struct CameraRig {
    params: CameraParams,
    pub orbit_angle: f32,
    pub polar_angle: f32,
    pub distance: f32,
    target_distance: f32,
    aspect: f32,
}

impl CameraRig {
    pub fn new(params: CameraParams) -> Self {
        let mut params = params;
        if params.min_distance > params.max_distance {
            std::mem::swap(&mut params.min_distance, &mut params.max_distance);
        }
        if params.min_polar > params.max_polar {
            std::mem::swap(&mut params.min_polar, &mut params.max_polar);
        }
        params.damping = if params.damping.is_finite() {
            params.damping.clamp(0.0, 1.0)
        } else {
            CAMERA_DAMPING
        };
        let distance = clamp_range(params.start_distance, params.min_distance, params.max_distance);
        Self {
            orbit_angle: params.start_orbit,
            polar_angle: clamp_range(params.start_polar, params.min_polar, params.max_polar),
            distance,
            target_distance: distance,
            aspect: 1.0,
            params,
        }
    }

    pub fn params(&self) -> &CameraParams {
        &self.params
    }

    pub fn damping_factor(&self) -> f32 {
        self.params.damping
    }

    pub fn target_distance(&self) -> f32 {
        self.target_distance
    }

    pub fn clamp_distance(&self, d: f32) -> f32 {
        clamp_range(d, self.params.min_distance, self.params.max_distance)
    }

    pub fn clamp_polar(&self, a: f32) -> f32 {
        clamp_range(a, self.params.min_polar, self.params.max_polar)
    }

    /// Integrate a raw wheel delta into the dolly target.
    pub fn apply_wheel(&mut self, delta_y: f32, sensitivity: f32) {
        if delta_y.is_finite() {
            self.target_distance = self.clamp_distance(self.target_distance + delta_y * sensitivity);
        }
    }

    /// Rotate by an NDC drag displacement.
    pub fn apply_drag(&mut self, dx: f32, dy: f32) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        let s = self.params.drag_sensitivity;
        self.orbit_angle = (self.orbit_angle - dx * s).rem_euclid(std::f32::consts::TAU);
        self.polar_angle = self.clamp_polar(self.polar_angle + dy * s);
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// One tick: take the tracker's zoom target and drag, then ease toward it.
    pub fn update(&mut self, input: &InputState) {
        self.target_distance = self.clamp_distance(input.camera_distance);
        self.apply_drag(input.drag_delta.x, input.drag_delta.y);
        self.step();
    }

    /// Move `distance` a damping fraction of the way to the target.
    pub fn step(&mut self) {
        let next = self.distance + (self.target_distance - self.distance) * self.params.damping;
        self.distance = self.clamp_distance(next);
    }

    pub fn eye(&self) -> Vec3 {
        let (sp, cp) = self.polar_angle.sin_cos();
        let (so, co) = self.orbit_angle.sin_cos();
        self.params.target + Vec3::new(sp * so, cp, sp * co) * self.distance
    }

    pub fn camera(&self) -> Camera {
        Camera {
            eye: self.eye(),
            target: self.params.target,
            up: Vec3::Y,
            aspect: self.aspect,
            fovy_radians: self.params.fovy_radians,
            znear: self.params.znear,
            zfar: self.params.zfar,
        }
    }
}

/// Clamp that treats NaN as the lower bound.
pub fn clamp_range(v: f32, lo: f32, hi: f32) -> f32 {
    if v.is_nan() {
        lo
    } else {
        v.clamp(lo, hi)
    }
}
