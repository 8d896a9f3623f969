//! Interactive ground grid: GPU wave, pointer repulsion and ripples.

use super::{frame_schema, AnimTarget, Animator, RippleLatch, TickInfo};
use crate::buffers::{GenerationRule, Shape};
use crate::constants::{GROUND_COLUMNS, GROUND_ROWS, GROUND_SPACING};
use crate::error::FxResult;
use crate::shader::ProgramRecipe;
use crate::uniforms::UniformSchema;
use glam::{Vec2, Vec3};

pub static RECIPE: ProgramRecipe = ProgramRecipe {
    label: "ground",
    wgsl: include_str!("../../shaders/ground.wgsl"),
    schema,
};

fn schema() -> FxResult<UniformSchema> {
    frame_schema()
        .field("color", Vec3::new(0.35, 0.65, 1.0))
        .field("wave_amplitude", 0.35f32)
        .field("ripple_origin", Vec2::ZERO)
        .field("ripple_start", -1000.0f32)
        .field("ripple_strength", 0.25f32)
        .field("pointer_world", Vec2::new(1.0e4, 1.0e4))
        .field("wave_frequency", 0.35f32)
        .field("repel_radius", 2.0f32)
        .field("point_scale", 1.0f32)
        .build()
}

pub(crate) fn requested_count() -> i64 {
    (GROUND_COLUMNS * GROUND_ROWS) as i64
}

pub(crate) fn rule() -> GenerationRule {
    GenerationRule::new(Shape::Grid {
        columns: GROUND_COLUMNS,
        rows: GROUND_ROWS,
        spacing: GROUND_SPACING,
    })
    .size(2.0, 3.5)
}

/// Half extents of the grid in world units.
pub fn half_extents() -> Vec2 {
    Vec2::new(
        (GROUND_COLUMNS.saturating_sub(1)) as f32 * GROUND_SPACING * 0.5,
        (GROUND_ROWS.saturating_sub(1)) as f32 * GROUND_SPACING * 0.5,
    )
}

/// Map pointer NDC onto the grid plane (screen up is far away, -z).
pub fn pointer_to_ground(ndc: Vec2) -> Vec2 {
    let h = half_extents();
    Vec2::new(ndc.x * h.x, -ndc.y * h.y)
}

pub struct GroundAnimator {
    latch: RippleLatch,
}

impl GroundAnimator {
    pub fn new() -> Self {
        Self {
            latch: RippleLatch::default(),
        }
    }
}

impl Animator for GroundAnimator {
    fn animate(&mut self, tick: &TickInfo<'_>, target: &mut AnimTarget<'_>) -> FxResult<()> {
        let at = pointer_to_ground(tick.input.pointer_ndc);
        target.uniforms.set("pointer_world", at)?;
        if self.latch.poll(tick.input.influence) {
            target.uniforms.set("ripple_origin", at)?;
            target.uniforms.set("ripple_start", tick.time)?;
            log::debug!("[scene] ground ripple at ({:.2}, {:.2})", at.x, at.y);
        }
        Ok(())
    }
}
