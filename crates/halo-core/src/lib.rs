//! Platform-neutral core of the interactive effects engine.
//!
//! Everything here is plain Rust with no browser or GPU dependency: input
//! tracking, buffer generation, the shader registry, effects, the scene
//! composer and the frame driver. A renderer plugs in through
//! [`backend::GpuBackend`].

pub mod backend;
pub mod buffers;
pub mod camera;
pub mod composer;
pub mod constants;
pub mod driver;
pub mod effects;
pub mod error;
pub mod input;
pub mod layer;
pub mod noise;
pub mod post;
pub mod runtime;
pub mod shader;
pub mod uniforms;

pub use backend::{DrawCall, FramePlan, GeometryHandle, GpuBackend, ProgramDesc, ProgramHandle};
pub use buffers::{AttributeSet, BufferGenerator, GenerationRule, Semantic, Shape, Span};
pub use camera::{Camera, CameraParams, CameraRig};
pub use composer::{EffectConfig, LightingRig, PageVariant, Scene, Viewport};
pub use driver::{AnimationDriver, Clock, TickReport};
pub use effects::{BlendMode, DepthMode, EffectKind, Topology};
pub use error::{FxError, FxResult};
pub use input::{InputState, InputTracker, TrackerParams};
pub use layer::{Layer, LayerId, UniformFrame};
pub use post::{BloomSettings, ChromaticSettings, PostChain, PostStep, PostUniforms};
pub use runtime::{MountHandle, TickOutcome};
pub use shader::{ShaderProgram, ShaderRegistry, POST_WGSL, PRELUDE_WGSL};
pub use uniforms::{UniformSchema, UniformStorage, UniformType, UniformValue};
