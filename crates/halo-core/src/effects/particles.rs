//! Particle cloud drifting through a noise flow field inside a sphere.
//!
//! Integration runs on the CPU so pointer attraction, repulsion and
//! dispersion act on real positions. Every step ends with a projection back
//! into the sphere, so the cloud stays inside its volume no matter how long
//! it runs.

use super::{frame_schema, AnimTarget, Animator, TickInfo};
use crate::buffers::{AttributeSet, GenerationRule, Semantic, Shape, Span};
use crate::constants::{PARTICLE_CLOUD_COUNT, PARTICLE_CLOUD_RADIUS};
use crate::error::FxResult;
use crate::noise;
use crate::shader::ProgramRecipe;
use crate::uniforms::UniformSchema;
use glam::Vec3;

pub static RECIPE: ProgramRecipe = ProgramRecipe {
    label: "particles",
    wgsl: include_str!("../../shaders/particles.wgsl"),
    schema,
};

fn schema() -> FxResult<UniformSchema> {
    frame_schema()
        .field("color_core", Vec3::new(0.55, 0.75, 1.0))
        .field("point_scale", 1.0f32)
        .field("color_edge", Vec3::new(0.95, 0.5, 0.9))
        .field("twinkle", 0.25f32)
        .build()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CloudMode {
    /// Particles are pulled toward the pointer.
    Attract,
    /// Particles are pushed away from the pointer.
    Repel,
}

pub(crate) fn requested_count() -> i64 {
    PARTICLE_CLOUD_COUNT as i64
}

pub(crate) fn rule() -> GenerationRule {
    let v = Span::new(-0.05, 0.05);
    GenerationRule::new(Shape::Sphere {
        radius: PARTICLE_CLOUD_RADIUS,
    })
    .size(1.5, 3.5)
    .velocity(v, v, v)
}

#[derive(Clone, Copy, Debug)]
pub struct CloudParams {
    pub radius: f32,
    pub flow_scale: f32,
    pub flow_speed: f32,
    pub flow_accel: f32,
    pub drag: f32,
    pub max_speed: f32,
    pub pointer_accel: f32,
    pub pointer_reach: f32,
    pub dispersion: f32,
}

impl Default for CloudParams {
    fn default() -> Self {
        Self {
            radius: PARTICLE_CLOUD_RADIUS,
            flow_scale: 0.35,
            flow_speed: 0.12,
            flow_accel: 0.4,
            drag: 1.6,
            max_speed: 1.5,
            pointer_accel: 3.0,
            pointer_reach: 1.8,
            dispersion: 1.2,
        }
    }
}

pub struct CloudAnimator {
    mode: CloudMode,
    params: CloudParams,
    seeds: Vec<f32>,
}

impl CloudAnimator {
    pub fn new(mode: CloudMode, buffers: &AttributeSet) -> Self {
        Self::with_params(mode, CloudParams::default(), buffers)
    }

    pub fn with_params(mode: CloudMode, params: CloudParams, buffers: &AttributeSet) -> Self {
        let seeds = buffers
            .get(Semantic::Seed)
            .map(|s| s.to_vec())
            .unwrap_or_else(|| vec![0.0; buffers.len()]);
        Self { mode, params, seeds }
    }

    /// Pointer position on the z = 0 plane through the cloud centre.
    fn pointer_world(&self, tick: &TickInfo<'_>) -> Vec3 {
        let p = tick.input.pointer_ndc * self.params.radius;
        Vec3::new(p.x, p.y, 0.0)
    }
}

impl Animator for CloudAnimator {
    fn animate(&mut self, tick: &TickInfo<'_>, target: &mut AnimTarget<'_>) -> FxResult<()> {
        let dt = tick.dt;
        if dt <= 0.0 {
            return Ok(());
        }
        let n = target.buffers.len();
        let prm = self.params;
        let influence = tick.input.influence;
        let pointer = self.pointer_world(tick);
        let sign = match self.mode {
            CloudMode::Attract => 1.0,
            CloudMode::Repel => -1.0,
        };
        let damping = (1.0 - prm.drag * dt).clamp(0.0, 1.0);
        let flow_t = tick.time * prm.flow_speed;

        // velocities first, then positions, using one consistent snapshot
        let mut positions = match target.buffers.get(Semantic::Position) {
            Some(p) => p.to_vec(),
            None => return Ok(()),
        };
        let seeds = &self.seeds;
        let mut moved = false;
        let steered = target.buffers.update(Semantic::Velocity, |velocities| {
            let mut steered = false;
            for i in 0..n {
                let b = i * 3;
                let p0 = Vec3::from_slice(&positions[b..b + 3]);
                let v0 = Vec3::from_slice(&velocities[b..b + 3]);
                let seed = seeds.get(i).copied().unwrap_or(0.0);

                let flow = noise::flow3(p0 * prm.flow_scale + Vec3::splat(seed * 11.0), flow_t);
                let mut v = v0 * damping + flow * prm.flow_accel * dt;

                if influence > 0.0 {
                    let to_pointer = pointer - p0;
                    let d = to_pointer.length();
                    let falloff = (1.0 - d / prm.pointer_reach).max(0.0);
                    v += to_pointer.normalize_or_zero() * sign * falloff * influence * prm.pointer_accel * dt;
                    // scatter outward, varied per particle
                    v += p0.normalize_or_zero() * (seed - 0.35) * influence * prm.dispersion * dt;
                }

                let speed = v.length();
                if speed > prm.max_speed {
                    v *= prm.max_speed / speed;
                }
                let mut p = p0 + v * dt;

                let r = p.length();
                if r > prm.radius {
                    let normal = p / r;
                    p = normal * prm.radius;
                    let outward = v.dot(normal);
                    if outward > 0.0 {
                        v -= normal * outward;
                    }
                }
                if !p.is_finite() || !v.is_finite() {
                    p = Vec3::ZERO;
                    v = Vec3::ZERO;
                }
                if p != p0 {
                    positions[b..b + 3].copy_from_slice(&p.to_array());
                    moved = true;
                }
                if v != v0 {
                    velocities[b..b + 3].copy_from_slice(&v.to_array());
                    steered = true;
                }
            }
            steered
        });
        if steered.is_none() {
            return Ok(());
        }

        if moved {
            if let Some(dst) = target.buffers.get_mut(Semantic::Position) {
                dst.copy_from_slice(&positions);
            }
        }
        Ok(())
    }
}
