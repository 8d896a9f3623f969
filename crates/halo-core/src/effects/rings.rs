//! Concentric decorative rings that spin and breathe.

use super::{frame_schema, AnimTarget, Animator, TickInfo};
use crate::buffers::{GenerationRule, Shape};
use crate::constants::{RING_COUNT, RING_SEGMENTS};
use crate::error::FxResult;
use crate::shader::ProgramRecipe;
use crate::uniforms::UniformSchema;
use glam::{Mat4, Vec3};
use smallvec::SmallVec;

pub static RECIPE: ProgramRecipe = ProgramRecipe {
    label: "rings",
    wgsl: include_str!("../../shaders/rings.wgsl"),
    schema,
};

fn schema() -> FxResult<UniformSchema> {
    frame_schema()
        .field("color", Vec3::new(0.6, 0.8, 1.0))
        .field("point_scale", 1.0f32)
        .field("wobble", 0.04f32)
        .field("glow", 0.8f32)
        .build()
}

pub(crate) fn requested_count() -> i64 {
    (RING_COUNT * RING_SEGMENTS) as i64
}

pub(crate) fn rule() -> GenerationRule {
    let radii: SmallVec<[f32; 4]> = (0..RING_COUNT).map(|i| 1.8 + i as f32 * 0.8).collect();
    GenerationRule::new(Shape::Rings {
        radii,
        jitter: 0.03,
    })
    .size(1.5, 2.5)
}

#[derive(Clone, Copy, Debug)]
pub struct RingAnimator {
    pub spin: f32,
    pub tilt: f32,
    pub breath_rate: f32,
    pub breath_amount: f32,
    angle: f32,
}

impl Default for RingAnimator {
    fn default() -> Self {
        Self {
            spin: 0.12,
            tilt: 0.35,
            breath_rate: 0.8,
            breath_amount: 0.04,
            angle: 0.0,
        }
    }
}

impl Animator for RingAnimator {
    fn animate(&mut self, tick: &TickInfo<'_>, target: &mut AnimTarget<'_>) -> FxResult<()> {
        // pointer energy speeds the spin up a little
        self.angle = (self.angle + tick.dt * self.spin * (1.0 + tick.input.influence)) % std::f32::consts::TAU;
        let breath = 1.0 + (tick.time * self.breath_rate).sin() * self.breath_amount;
        *target.transform = Mat4::from_rotation_x(self.tilt)
            * Mat4::from_rotation_y(self.angle)
            * Mat4::from_scale(Vec3::splat(breath));
        Ok(())
    }
}
