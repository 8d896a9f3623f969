//! Sparse cube cluster carved out of a lattice by a skip probability.

use super::{frame_schema, AnimTarget, Animator, TickInfo};
use crate::buffers::{GenerationRule, Shape};
use crate::constants::{CUBE_GRID_SIDE, CUBE_SKIP_PROBABILITY};
use crate::error::FxResult;
use crate::shader::ProgramRecipe;
use crate::uniforms::UniformSchema;
use glam::{Mat4, Vec3};

pub const CUBE_SPACING: f32 = 0.45;

pub static RECIPE: ProgramRecipe = ProgramRecipe {
    label: "cubes",
    wgsl: include_str!("../../shaders/cubes.wgsl"),
    schema,
};

fn schema() -> FxResult<UniformSchema> {
    frame_schema()
        .field("key_direction", Vec3::new(-0.4, -1.0, -0.3))
        .field("ambient", 0.25f32)
        .field("key_color", Vec3::ONE)
        .field("cube_size", CUBE_SPACING * 0.8)
        .field("tint", Vec3::new(0.45, 0.55, 0.9))
        .field("bob", 0.05f32)
        .build()
}

pub(crate) fn requested_count() -> i64 {
    (CUBE_GRID_SIDE * CUBE_GRID_SIDE * CUBE_GRID_SIDE) as i64
}

pub(crate) fn rule() -> GenerationRule {
    GenerationRule::new(Shape::Lattice {
        side: CUBE_GRID_SIDE,
        spacing: CUBE_SPACING,
    })
    .size(0.6, 1.0)
    .skip(CUBE_SKIP_PROBABILITY)
}

#[derive(Clone, Copy, Debug)]
pub struct CubeAnimator {
    pub spin: f32,
    pub pointer_tilt: f32,
    yaw: f32,
    tilt: glam::Vec2,
}

impl Default for CubeAnimator {
    fn default() -> Self {
        Self {
            spin: 0.15,
            pointer_tilt: 0.3,
            yaw: 0.0,
            tilt: glam::Vec2::ZERO,
        }
    }
}

impl Animator for CubeAnimator {
    fn animate(&mut self, tick: &TickInfo<'_>, target: &mut AnimTarget<'_>) -> FxResult<()> {
        self.yaw = (self.yaw + tick.dt * self.spin) % std::f32::consts::TAU;
        // ease toward the pointer so the cluster leans without snapping
        let goal = tick.input.pointer_ndc * self.pointer_tilt;
        let k = (tick.dt * 4.0).clamp(0.0, 1.0);
        self.tilt += (goal - self.tilt) * k;
        *target.transform = Mat4::from_rotation_x(-self.tilt.y)
            * Mat4::from_rotation_y(self.yaw + self.tilt.x);
        Ok(())
    }
}
