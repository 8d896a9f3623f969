//! Effect catalogue.
//!
//! An [`EffectKind`] is resolved once when a layer is built: it picks the
//! program recipe, the buffer generation rule and the animator. Nothing
//! re-inspects the kind per frame.

pub mod background;
pub mod cascade;
pub mod cubes;
pub mod ground;
pub mod lanes;
pub mod particles;
pub mod rings;

use crate::buffers::{AttributeSet, BufferGenerator, GenerationRule};
use crate::error::FxResult;
use crate::input::InputState;
use crate::shader::ProgramRecipe;
use crate::uniforms::{SchemaBuilder, UniformSchema, UniformStorage};
use glam::{Mat4, Vec2};

pub use cascade::CascadeSide;
pub use particles::CloudMode;

/// How a layer's primitives are rasterised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    /// One oversized triangle, no instance data.
    Fullscreen,
    /// Camera-facing quads, one per primitive.
    PointSprites,
    /// Unit cubes, one per primitive.
    InstancedCubes,
}

impl Topology {
    pub fn vertices_per_instance(self) -> u32 {
        match self {
            Topology::Fullscreen => 3,
            Topology::PointSprites => 6,
            Topology::InstancedCubes => 36,
        }
    }

    pub fn uses_instances(self) -> bool {
        !matches!(self, Topology::Fullscreen)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Premultiplied "over".
    Over,
    Additive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepthMode {
    Off,
    /// Depth test without writes (translucent sprites).
    Test,
    TestWrite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    BackgroundField,
    GroundPlane,
    ParticleCloud(CloudMode),
    Rings,
    Lanes,
    Cascade(CascadeSide),
    CubeCluster,
}

impl EffectKind {
    pub fn label(&self) -> &'static str {
        match self {
            EffectKind::BackgroundField => "background",
            EffectKind::GroundPlane => "ground",
            EffectKind::ParticleCloud(_) => "particles",
            EffectKind::Rings => "rings",
            EffectKind::Lanes => "lanes",
            EffectKind::Cascade(CascadeSide::Left) => "cascade-left",
            EffectKind::Cascade(CascadeSide::Right) => "cascade-right",
            EffectKind::CubeCluster => "cubes",
        }
    }

    pub fn recipe(&self) -> &'static ProgramRecipe {
        match self {
            EffectKind::BackgroundField => &background::RECIPE,
            EffectKind::GroundPlane => &ground::RECIPE,
            EffectKind::ParticleCloud(_) => &particles::RECIPE,
            EffectKind::Rings => &rings::RECIPE,
            EffectKind::Lanes => &lanes::RECIPE,
            EffectKind::Cascade(_) => &cascade::RECIPE,
            EffectKind::CubeCluster => &cubes::RECIPE,
        }
    }

    pub fn topology(&self) -> Topology {
        match self {
            EffectKind::BackgroundField => Topology::Fullscreen,
            EffectKind::CubeCluster => Topology::InstancedCubes,
            _ => Topology::PointSprites,
        }
    }

    pub fn blend(&self) -> BlendMode {
        match self {
            EffectKind::BackgroundField | EffectKind::CubeCluster => BlendMode::Over,
            _ => BlendMode::Additive,
        }
    }

    pub fn depth(&self) -> DepthMode {
        match self.topology() {
            Topology::Fullscreen => DepthMode::Off,
            Topology::PointSprites => DepthMode::Test,
            Topology::InstancedCubes => DepthMode::TestWrite,
        }
    }

    /// Primitive count requested from the generator.
    pub fn requested_count(&self) -> i64 {
        match self {
            EffectKind::BackgroundField => 0,
            EffectKind::GroundPlane => ground::requested_count(),
            EffectKind::ParticleCloud(_) => particles::requested_count(),
            EffectKind::Rings => rings::requested_count(),
            EffectKind::Lanes => lanes::requested_count(),
            EffectKind::Cascade(_) => cascade::requested_count(),
            EffectKind::CubeCluster => cubes::requested_count(),
        }
    }

    pub fn rule(&self) -> Option<GenerationRule> {
        match self {
            EffectKind::BackgroundField => None,
            EffectKind::GroundPlane => Some(ground::rule()),
            EffectKind::ParticleCloud(_) => Some(particles::rule()),
            EffectKind::Rings => Some(rings::rule()),
            EffectKind::Lanes => Some(lanes::rule()),
            EffectKind::Cascade(_) => Some(cascade::rule()),
            EffectKind::CubeCluster => Some(cubes::rule()),
        }
    }

    /// Generate this effect's buffers.
    pub fn generate(&self, generator: &mut BufferGenerator) -> AttributeSet {
        match self.rule() {
            Some(rule) => generator.generate(self.requested_count(), &rule),
            None => AttributeSet::with_len(0),
        }
    }

    /// Per-instance uniform values that differ from the recipe defaults.
    pub fn configure(&self, uniforms: &mut UniformStorage) -> FxResult<()> {
        match self {
            EffectKind::Cascade(side) => cascade::configure(*side, uniforms),
            _ => Ok(()),
        }
    }

    /// Initial model transform.
    pub fn placement(&self) -> Mat4 {
        match self {
            EffectKind::Cascade(side) => cascade::placement(*side),
            _ => Mat4::IDENTITY,
        }
    }

    /// Pick the animator for a freshly generated buffer set.
    pub fn animator(&self, generator: &mut BufferGenerator, buffers: &AttributeSet) -> Box<dyn Animator> {
        match self {
            EffectKind::BackgroundField => Box::new(background::BackgroundAnimator::default()),
            EffectKind::GroundPlane => Box::new(ground::GroundAnimator::new()),
            EffectKind::ParticleCloud(mode) => Box::new(particles::CloudAnimator::new(*mode, buffers)),
            EffectKind::Rings => Box::new(rings::RingAnimator::default()),
            EffectKind::Lanes => Box::new(lanes::LaneAnimator::new(buffers)),
            EffectKind::Cascade(_) => Box::new(cascade::CascadeAnimator::new(generator.fork(), buffers)),
            EffectKind::CubeCluster => Box::new(cubes::CubeAnimator::default()),
        }
    }
}

/// Per-tick inputs handed to animators.
#[derive(Clone, Copy, Debug)]
pub struct TickInfo<'a> {
    pub dt: f32,
    /// Monotonic scene clock, the same value pushed as the `time` uniform.
    pub time: f32,
    pub input: &'a InputState,
}

/// What an animator may touch: its own layer's state, nothing else.
pub struct AnimTarget<'a> {
    pub buffers: &'a mut AttributeSet,
    pub uniforms: &'a mut UniformStorage,
    pub transform: &'a mut Mat4,
}

pub trait Animator {
    fn animate(&mut self, tick: &TickInfo<'_>, target: &mut AnimTarget<'_>) -> FxResult<()>;
}

/// Uniforms every effect module declares first, in this order.
pub fn frame_schema() -> SchemaBuilder {
    UniformSchema::builder()
        .field("view_proj", Mat4::IDENTITY)
        .field("model", Mat4::IDENTITY)
        .field("resolution", Vec2::ONE)
        .field("pointer", Vec2::ZERO)
        .field("time", 0.0f32)
        .field("opacity", 1.0f32)
        .field("influence", 0.0f32)
        .field("scroll", 0.0f32)
}

/// Rising-edge detector on pointer influence.
///
/// Fires once when influence crosses `trigger`, then re-arms after it falls
/// under half of it, so a sustained fast drag yields one ripple.
#[derive(Clone, Copy, Debug)]
pub struct RippleLatch {
    trigger: f32,
    armed: bool,
}

impl RippleLatch {
    pub fn new(trigger: f32) -> Self {
        Self {
            trigger,
            armed: true,
        }
    }

    pub fn poll(&mut self, influence: f32) -> bool {
        if self.armed && influence >= self.trigger {
            self.armed = false;
            return true;
        }
        if !self.armed && influence < self.trigger * 0.5 {
            self.armed = true;
        }
        false
    }
}

impl Default for RippleLatch {
    fn default() -> Self {
        Self::new(crate::constants::RIPPLE_TRIGGER_INFLUENCE)
    }
}
