//! Particles flowing along parallel lanes, wrapping at the lane ends.

use super::{frame_schema, AnimTarget, Animator, TickInfo};
use crate::buffers::{AttributeSet, GenerationRule, Semantic, Shape, Span};
use crate::constants::{LANE_COUNT, LANE_LENGTH, LANE_PARTICLES};
use crate::error::FxResult;
use crate::noise;
use crate::shader::ProgramRecipe;
use crate::uniforms::UniformSchema;
use glam::{Vec2, Vec3};

pub const LANE_SPACING: f32 = 0.6;

pub static RECIPE: ProgramRecipe = ProgramRecipe {
    label: "lanes",
    wgsl: include_str!("../../shaders/lanes.wgsl"),
    schema,
};

fn schema() -> FxResult<UniformSchema> {
    frame_schema()
        .field("color", Vec3::new(0.4, 0.9, 0.8))
        .field("lane_length", LANE_LENGTH)
        .field("point_scale", 1.0f32)
        .field("streak", 0.6f32)
        .build()
}

pub(crate) fn requested_count() -> i64 {
    (LANE_COUNT * LANE_PARTICLES) as i64
}

pub(crate) fn rule() -> GenerationRule {
    GenerationRule::new(Shape::Lanes {
        lanes: LANE_COUNT,
        length: LANE_LENGTH,
        spacing: LANE_SPACING,
    })
    .size(1.5, 3.0)
    .velocity(Span::fixed(0.0), Span::fixed(0.0), Span::new(0.8, 2.2))
}

/// Wrap `z` into `[-length / 2, length / 2)`.
pub fn wrap_lane(z: f32, length: f32) -> f32 {
    if length.is_nan() || length <= 0.0 || !z.is_finite() {
        return 0.0;
    }
    let half = length * 0.5;
    (z + half).rem_euclid(length) - half
}

pub struct LaneAnimator {
    length: f32,
    /// Lane centre x per particle, captured at creation.
    anchors: Vec<f32>,
    seeds: Vec<f32>,
}

impl LaneAnimator {
    pub fn new(buffers: &AttributeSet) -> Self {
        let n = buffers.len();
        let anchors = (0..n)
            .map(|i| buffers.vec3(Semantic::Position, i).map(|p| p.x).unwrap_or(0.0))
            .collect();
        let seeds = buffers
            .get(Semantic::Seed)
            .map(|s| s.to_vec())
            .unwrap_or_else(|| vec![0.0; n]);
        Self {
            length: LANE_LENGTH,
            anchors,
            seeds,
        }
    }
}

impl Animator for LaneAnimator {
    fn animate(&mut self, tick: &TickInfo<'_>, target: &mut AnimTarget<'_>) -> FxResult<()> {
        let n = target.buffers.len();
        let boost = 1.0 + tick.input.influence * 2.0 + tick.input.scroll_normalized;
        let speeds: Vec<f32> = match target.buffers.get(Semantic::Velocity) {
            Some(v) => v.chunks_exact(3).map(|c| c[2]).collect(),
            None => return Ok(()),
        };
        let Some(positions) = target.buffers.get_mut(Semantic::Position) else {
            return Ok(());
        };
        for i in 0..n {
            let b = i * 3;
            let seed = self.seeds.get(i).copied().unwrap_or(0.0);
            let z = wrap_lane(positions[b + 2] + speeds[i] * boost * tick.dt, self.length);
            let sway = noise::value2(Vec2::new(z * 0.4, tick.time * 0.5 + seed * 7.0)) * 0.06;
            let x = self.anchors.get(i).copied().unwrap_or(0.0) + sway;
            let y = noise::simplex2(Vec2::new(seed * 13.0, tick.time * 0.3)) * 0.03;
            positions[b..b + 3].copy_from_slice(&Vec3::new(x, y, z).to_array());
        }
        Ok(())
    }
}
