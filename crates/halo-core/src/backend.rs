//! Seam between the scene and whatever owns the GPU.
//!
//! The scene only talks to a [`GpuBackend`]; the browser build implements it
//! with wgpu, tests implement it with a recording fake.

use crate::buffers::{AttributeSet, Semantic};
use crate::effects::{BlendMode, DepthMode, Topology};
use crate::error::FxResult;
use crate::post::PostStep;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u32);

/// Everything needed to build one render pipeline.
#[derive(Clone, Copy, Debug)]
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    /// Complete WGSL module.
    pub source: &'a str,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    /// Uniform block size in bytes.
    pub uniform_size: usize,
    pub topology: Topology,
    pub blend: BlendMode,
    pub depth: DepthMode,
}

/// One layer's draw inside a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCall {
    pub program: ProgramHandle,
    pub geometry: GeometryHandle,
    pub topology: Topology,
    pub vertex_count: u32,
    pub instance_count: u32,
    pub render_order: i32,
}

/// A fully prepared frame. Uniform and attribute writes for this frame have
/// already been issued when the backend receives it.
#[derive(Clone, Debug, PartialEq)]
pub struct FramePlan {
    pub clear_color: [f32; 3],
    pub time: f32,
    /// Draws in render order.
    pub draws: Vec<DrawCall>,
    /// Enabled post passes in application order.
    pub post: SmallVec<[PostStep; 4]>,
    pub exposure: f32,
}

pub trait GpuBackend {
    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> FxResult<ProgramHandle>;
    /// Upload a layer's attribute set as instance buffers.
    fn create_geometry(&mut self, label: &str, buffers: &AttributeSet) -> FxResult<GeometryHandle>;
    fn write_uniforms(&mut self, program: ProgramHandle, bytes: &[u8]);
    fn write_attribute(&mut self, geometry: GeometryHandle, semantic: Semantic, data: &[f32]);
    fn release_program(&mut self, program: ProgramHandle);
    fn release_geometry(&mut self, geometry: GeometryHandle);
    /// Backing-store size in physical pixels.
    fn resize(&mut self, width: u32, height: u32);
    fn render(&mut self, plan: &FramePlan) -> FxResult<()>;
}
