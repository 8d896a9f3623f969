//! Post-processing chain: bloom and chromatic aberration.
//!
//! The chain is an ordered list of passes, each of which can be switched
//! off. Disabled passes simply drop out of the frame's plan. The CPU helpers
//! mirror `shaders/post.wgsl` and are what the tests pin down.

use crate::constants::{BLOOM_RADIUS, BLOOM_STRENGTH, BLOOM_THRESHOLD, CHROMATIC_STRENGTH};
use glam::{Vec2, Vec3};
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomSettings {
    pub strength: f32,
    /// Luminance above which pixels contribute.
    pub threshold: f32,
    /// Blur tap spacing in half-resolution texels.
    pub radius: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: BLOOM_STRENGTH,
            threshold: BLOOM_THRESHOLD,
            radius: BLOOM_RADIUS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChromaticSettings {
    /// Channel offset at the frame edge, in UV units.
    pub strength: f32,
}

impl Default for ChromaticSettings {
    fn default() -> Self {
        Self {
            strength: CHROMATIC_STRENGTH,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PostStep {
    Bloom(BloomSettings),
    ChromaticAberration(ChromaticSettings),
}

impl PostStep {
    pub fn name(&self) -> &'static str {
        match self {
            PostStep::Bloom(_) => "bloom",
            PostStep::ChromaticAberration(_) => "chromatic",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PostPass {
    pub step: PostStep,
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PostChain {
    passes: SmallVec<[PostPass; 4]>,
    pub exposure: f32,
}

impl Default for PostChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl PostChain {
    pub fn empty() -> Self {
        Self {
            passes: SmallVec::new(),
            exposure: 1.0,
        }
    }

    pub fn with(mut self, step: PostStep) -> Self {
        self.passes.push(PostPass {
            step,
            enabled: true,
        });
        self
    }

    pub fn passes(&self) -> &[PostPass] {
        &self.passes
    }

    /// Toggle every pass with the given name. Unknown names are ignored.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        for p in self.passes.iter_mut().filter(|p| p.step.name() == name) {
            p.enabled = enabled;
        }
    }

    /// Enabled passes in application order.
    pub fn plan(&self) -> SmallVec<[PostStep; 4]> {
        self.passes
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.step)
            .collect()
    }
}

/// Uniform block shared by every post stage (`PostUniforms` in WGSL).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PostUniforms {
    pub resolution: [f32; 2],
    pub blur_dir: [f32; 2],
    pub time: f32,
    pub threshold: f32,
    pub bloom_strength: f32,
    pub bloom_radius: f32,
    pub chroma_strength: f32,
    pub exposure: f32,
    pub _pad: [f32; 2],
}

impl PostUniforms {
    pub fn for_step(step: &PostStep, resolution: [f32; 2], time: f32, exposure: f32) -> Self {
        let mut u = Self {
            resolution,
            time,
            exposure,
            ..Self::default()
        };
        match step {
            PostStep::Bloom(b) => {
                u.threshold = b.threshold;
                u.bloom_strength = b.strength;
                u.bloom_radius = b.radius;
            }
            PostStep::ChromaticAberration(c) => u.chroma_strength = c.strength,
        }
        u
    }

    pub fn with_blur_dir(mut self, dir: [f32; 2]) -> Self {
        self.blur_dir = dir;
        self
    }
}

/// Rec. 709 luma.
pub fn luminance(c: Vec3) -> f32 {
    c.dot(Vec3::new(0.2126, 0.7152, 0.0722))
}

/// Portion of `c` that survives the bloom bright pass.
pub fn bright_pass(c: Vec3, threshold: f32) -> Vec3 {
    let l = luminance(c);
    let k = (l - threshold).max(0.0) / l.max(1e-4);
    c * k
}

/// One side of the 9-tap separable Gaussian used by the blur stage.
pub const BLUR_WEIGHTS: [f32; 5] = [0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216];

/// Sum of all nine taps.
pub fn blur_weight_total() -> f32 {
    BLUR_WEIGHTS[0] + 2.0 * BLUR_WEIGHTS[1..].iter().sum::<f32>()
}

/// Red-channel UV offset for a pixel; blue uses the negation.
pub fn chroma_offset(uv: Vec2, strength: f32) -> Vec2 {
    (uv - Vec2::splat(0.5)) * strength
}

/// Reinhard tone map applied by the present stage.
pub fn tonemap(c: Vec3, exposure: f32) -> Vec3 {
    let e = c * exposure;
    e / (Vec3::ONE + e)
}
