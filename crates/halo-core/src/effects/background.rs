//! Full-bleed noise field behind every page variant.

use super::{frame_schema, AnimTarget, Animator, RippleLatch, TickInfo};
use crate::error::FxResult;
use crate::shader::ProgramRecipe;
use crate::uniforms::UniformSchema;
use glam::{Vec2, Vec3};

pub static RECIPE: ProgramRecipe = ProgramRecipe {
    label: "background",
    wgsl: include_str!("../../shaders/background.wgsl"),
    schema,
};

fn schema() -> FxResult<UniformSchema> {
    frame_schema()
        .field("color_a", Vec3::new(0.03, 0.05, 0.12))
        .field("ripple_start", -1000.0f32)
        .field("color_b", Vec3::new(0.25, 0.45, 0.95))
        .field("intensity", 1.0f32)
        .field("ripple_origin", Vec2::ZERO)
        .field("glow_radius", 0.35f32)
        .build()
}

#[derive(Default)]
pub struct BackgroundAnimator {
    latch: RippleLatch,
}

impl Animator for BackgroundAnimator {
    fn animate(&mut self, tick: &TickInfo<'_>, target: &mut AnimTarget<'_>) -> FxResult<()> {
        if self.latch.poll(tick.input.influence) {
            target.uniforms.set("ripple_origin", tick.input.pointer_ndc)?;
            target.uniforms.set("ripple_start", tick.time)?;
        }
        Ok(())
    }
}
