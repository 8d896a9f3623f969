//! One independently rendered visual element.

use crate::backend::{DrawCall, GeometryHandle, GpuBackend, ProgramDesc, ProgramHandle};
use crate::buffers::{AttributeSet, BufferGenerator};
use crate::effects::{AnimTarget, Animator, EffectKind, TickInfo, Topology};
use crate::error::FxResult;
use crate::input::InputState;
use crate::shader::{ShaderProgram, ShaderRegistry};
use glam::{Mat4, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

/// Per-frame values every layer pushes into its program.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformFrame {
    pub time: f32,
    pub pointer_ndc: Vec2,
    /// Backing-store size in physical pixels.
    pub resolution: Vec2,
    pub influence: f32,
    pub scroll: f32,
    pub view_proj: Mat4,
}

pub struct Layer {
    id: LayerId,
    kind: EffectKind,
    buffers: AttributeSet,
    program: ShaderProgram,
    render_order: i32,
    transform: Mat4,
    opacity: f32,
    time: f32,
    animator: Box<dyn Animator>,
    gpu: Option<(ProgramHandle, GeometryHandle)>,
}

impl Layer {
    /// Build the CPU side of a layer: buffers, program instance and animator.
    pub fn build(
        id: LayerId,
        kind: EffectKind,
        render_order: i32,
        opacity: f32,
        registry: &mut ShaderRegistry,
        generator: &mut BufferGenerator,
    ) -> FxResult<Self> {
        let mut program = registry.instantiate(kind.recipe())?;
        kind.configure(program.uniforms_mut())?;
        let buffers = kind.generate(generator);
        let animator = kind.animator(generator, &buffers);
        let opacity = opacity.clamp(0.0, 1.0);
        program.uniforms_mut().set("opacity", opacity)?;
        Ok(Self {
            id,
            kind,
            buffers,
            program,
            render_order,
            transform: kind.placement(),
            opacity,
            time: 0.0,
            animator,
            gpu: None,
        })
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn render_order(&self) -> i32 {
        self.render_order
    }

    pub fn buffers(&self) -> &AttributeSet {
        &self.buffers
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Primitive count, fixed for the layer's lifetime.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn is_allocated(&self) -> bool {
        self.gpu.is_some()
    }

    /// Create the GPU program and instance buffers.
    ///
    /// On failure nothing stays allocated for this layer.
    pub fn allocate(&mut self, backend: &mut dyn GpuBackend) -> FxResult<()> {
        if self.gpu.is_some() {
            return Ok(());
        }
        let label = self.kind.label();
        let program = backend.create_program(&ProgramDesc {
            label,
            source: self.program.source(),
            vertex_entry: self.program.vertex_entry(),
            fragment_entry: self.program.fragment_entry(),
            uniform_size: self.program.schema().size(),
            topology: self.kind.topology(),
            blend: self.kind.blend(),
            depth: self.kind.depth(),
        })?;
        let geometry = match backend.create_geometry(label, &self.buffers) {
            Ok(g) => g,
            Err(e) => {
                backend.release_program(program);
                return Err(e);
            }
        };
        // initial contents were uploaded with the buffers
        let _ = self.buffers.take_dirty();
        self.gpu = Some((program, geometry));
        Ok(())
    }

    /// Release GPU resources; safe to call more than once.
    pub fn release(&mut self, backend: &mut dyn GpuBackend) {
        if let Some((program, geometry)) = self.gpu.take() {
            backend.release_geometry(geometry);
            backend.release_program(program);
        }
    }

    /// Push the frame-wide uniforms.
    pub fn begin_frame(&mut self, frame: &UniformFrame) {
        self.time = frame.time;
        let u = self.program.uniforms_mut();
        u.set_if_declared("time", frame.time);
        u.set_if_declared("pointer", frame.pointer_ndc);
        u.set_if_declared("resolution", frame.resolution);
        u.set_if_declared("influence", frame.influence);
        u.set_if_declared("scroll", frame.scroll);
        u.set_if_declared("view_proj", frame.view_proj);
    }

    /// Advance this layer's own animation by `dt` seconds.
    pub fn update(&mut self, dt: f32, input: &InputState) {
        let tick = TickInfo {
            dt,
            time: self.time,
            input,
        };
        let mut target = AnimTarget {
            buffers: &mut self.buffers,
            uniforms: self.program.uniforms_mut(),
            transform: &mut self.transform,
        };
        if let Err(e) = self.animator.animate(&tick, &mut target) {
            log::warn!("[scene] layer {} ({}) update: {}", self.id.0, self.kind.label(), e);
        }
        let model = self.transform;
        self.program.uniforms_mut().set_if_declared("model", model);
    }

    /// Upload whatever changed since the last flush.
    pub fn flush(&mut self, backend: &mut dyn GpuBackend) {
        let Some((program, geometry)) = self.gpu else {
            return;
        };
        if self.program.uniforms_mut().take_dirty() {
            backend.write_uniforms(program, self.program.uniforms().as_bytes());
        }
        for semantic in self.buffers.take_dirty() {
            if let Some(data) = self.buffers.get(semantic) {
                backend.write_attribute(geometry, semantic, data);
            }
        }
    }

    pub fn draw_call(&self) -> Option<DrawCall> {
        let (program, geometry) = self.gpu?;
        let topology = self.kind.topology();
        let instance_count = match topology {
            Topology::Fullscreen => 1,
            _ => u32::try_from(self.buffers.len()).ok()?,
        };
        if instance_count == 0 || self.opacity <= 0.0 {
            return None;
        }
        Some(DrawCall {
            program,
            geometry,
            topology,
            vertex_count: topology.vertices_per_instance(),
            instance_count,
            render_order: self.render_order,
        })
    }
}
