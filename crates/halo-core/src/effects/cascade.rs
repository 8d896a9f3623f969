//! Falling particle emitters. Left and right copies share one recipe and
//! differ only in placement and their own colour uniform.

use super::{frame_schema, AnimTarget, Animator, TickInfo};
use crate::buffers::{AttributeSet, BufferGenerator, GenerationRule, Semantic, Shape, Span};
use crate::constants::CASCADE_COUNT;
use crate::error::FxResult;
use crate::shader::ProgramRecipe;
use crate::uniforms::{UniformSchema, UniformStorage};
use glam::{Mat4, Vec3};

pub static RECIPE: ProgramRecipe = ProgramRecipe {
    label: "cascade",
    wgsl: include_str!("../../shaders/cascade.wgsl"),
    schema,
};

fn schema() -> FxResult<UniformSchema> {
    frame_schema()
        .field("color", Vec3::ONE)
        .field("point_scale", 1.0f32)
        .build()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CascadeSide {
    Left,
    Right,
}

impl CascadeSide {
    pub fn color(self) -> Vec3 {
        match self {
            CascadeSide::Left => Vec3::new(0.3, 0.8, 1.0),
            CascadeSide::Right => Vec3::new(1.0, 0.35, 0.8),
        }
    }

    fn offset_x(self) -> f32 {
        match self {
            CascadeSide::Left => -3.2,
            CascadeSide::Right => 3.2,
        }
    }
}

/// Emitter volume in layer space.
pub fn emitter_shape() -> Shape {
    Shape::Box {
        half_extents: Vec3::new(0.6, 0.2, 0.6),
    }
}

pub(crate) fn requested_count() -> i64 {
    CASCADE_COUNT as i64
}

pub(crate) fn rule() -> GenerationRule {
    let lateral = Span::new(-0.15, 0.15);
    GenerationRule::new(emitter_shape())
        .size(1.5, 3.0)
        // initial age fraction, so the first wave is staggered
        .phase(0.0, 1.0)
        .velocity(lateral, Span::new(-1.6, -0.6), lateral)
        .lifetime(1.5, 3.5)
}

pub(crate) fn configure(side: CascadeSide, uniforms: &mut UniformStorage) -> FxResult<()> {
    uniforms.set("color", side.color())
}

pub(crate) fn placement(side: CascadeSide) -> Mat4 {
    Mat4::from_translation(Vec3::new(side.offset_x(), 2.5, 0.0))
}

pub struct CascadeAnimator {
    generator: BufferGenerator,
    rule: GenerationRule,
    gravity: f32,
    /// Seconds since each particle's last spawn.
    ages: Vec<f32>,
    /// Integrated on the CPU only; the shader never reads velocity.
    velocities: Vec<Vec3>,
}

impl CascadeAnimator {
    pub fn new(generator: BufferGenerator, buffers: &AttributeSet) -> Self {
        let lifetimes = buffers.get(Semantic::Lifetime).unwrap_or(&[]);
        let phases = buffers.get(Semantic::Phase).unwrap_or(&[]);
        let ages = lifetimes
            .iter()
            .zip(phases.iter())
            .map(|(l, p)| l * p.clamp(0.0, 1.0))
            .collect();
        let velocities = (0..buffers.len())
            .map(|i| buffers.vec3(Semantic::Velocity, i).unwrap_or(Vec3::ZERO))
            .collect();
        Self {
            generator,
            rule: rule(),
            gravity: 0.4,
            ages,
            velocities,
        }
    }
}

impl Animator for CascadeAnimator {
    fn animate(&mut self, tick: &TickInfo<'_>, target: &mut AnimTarget<'_>) -> FxResult<()> {
        let n = target.buffers.len().min(self.ages.len()).min(self.velocities.len());
        let dt = tick.dt;
        if dt <= 0.0 {
            return Ok(());
        }
        let lifetimes: Vec<f32> = target.buffers.get(Semantic::Lifetime).unwrap_or(&[]).to_vec();
        if lifetimes.len() < n {
            return Ok(());
        }

        let mut respawned: Vec<(usize, Vec3)> = Vec::new();
        for i in 0..n {
            self.ages[i] += dt;
            if self.ages[i] >= lifetimes[i] {
                self.ages[i] = 0.0;
                let p = self.generator.position(&self.rule.shape, i, n);
                self.velocities[i] = self.generator.velocity(&self.rule);
                respawned.push((i, p));
            } else {
                self.velocities[i].y -= self.gravity * dt;
            }
        }

        if let Some(pos) = target.buffers.get_mut(Semantic::Position) {
            for (i, v) in self.velocities.iter().enumerate().take(n) {
                let b = i * 3;
                for (k, dv) in v.to_array().into_iter().enumerate() {
                    pos[b + k] += dv * dt;
                }
            }
            for (i, p) in &respawned {
                pos[i * 3..i * 3 + 3].copy_from_slice(&p.to_array());
            }
        }
        if let Some(phase) = target.buffers.get_mut(Semantic::Phase) {
            for i in 0..n {
                phase[i] = (self.ages[i] / lifetimes[i].max(1e-3)).clamp(0.0, 1.0);
            }
        }
        Ok(())
    }
}
