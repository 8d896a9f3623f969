use super::helpers::{blend_state, depth_state, instance_layouts, HDR_FORMAT};
use halo_core::{AttributeSet, ProgramDesc, Semantic};
use wgpu::util::DeviceExt;

/// Index-addressed storage whose freed slots are reused.
pub(crate) struct Slab<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> Slab<T> {
    pub(crate) fn insert(&mut self, value: T) -> u32 {
        match self.slots.iter().position(Option::is_none) {
            Some(i) => {
                self.slots[i] = Some(value);
                i as u32
            }
            None => {
                self.slots.push(Some(value));
                (self.slots.len() - 1) as u32
            }
        }
    }

    pub(crate) fn get(&self, id: u32) -> Option<&T> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    pub(crate) fn remove(&mut self, id: u32) -> Option<T> {
        self.slots.get_mut(id as usize).and_then(Option::take)
    }

    pub(crate) fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

pub(crate) struct ProgramSlot {
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) uniform_buffer: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
    pub(crate) uniform_size: u64,
}

pub(crate) struct GeometrySlot {
    /// In `Semantic::ALL` order, which is also the vertex buffer slot order.
    pub(crate) buffers: Vec<(Semantic, wgpu::Buffer)>,
    pub(crate) len: usize,
}

impl GeometrySlot {
    pub(crate) fn buffer(&self, semantic: Semantic) -> Option<&wgpu::Buffer> {
        self.buffers.iter().find(|(s, _)| *s == semantic).map(|(_, b)| b)
    }
}

pub(crate) fn create_layer_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("layer_bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

pub(crate) fn create_program(
    device: &wgpu::Device,
    layer_bgl: &wgpu::BindGroupLayout,
    desc: &ProgramDesc<'_>,
) -> ProgramSlot {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(desc.label),
        source: wgpu::ShaderSource::Wgsl(desc.source.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(desc.label),
        bind_group_layouts: &[layer_bgl],
        push_constant_ranges: &[],
    });
    let instanced = instance_layouts();
    let buffers: &[wgpu::VertexBufferLayout<'_>] = if desc.topology.uses_instances() {
        &instanced
    } else {
        &[]
    };
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some(desc.vertex_entry),
            buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(depth_state(desc.depth)),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some(desc.fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend: Some(blend_state(desc.blend)),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        cache: None,
        multiview: None,
    });
    // uniform bindings must be a multiple of 16 bytes
    let uniform_size = (desc.uniform_size.max(16) as u64).next_multiple_of(16);
    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(desc.label),
        size: uniform_size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(desc.label),
        layout: layer_bgl,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });
    ProgramSlot {
        pipeline,
        uniform_buffer,
        bind_group,
        uniform_size,
    }
}

/// One instance buffer per semantic, seeded with the current contents.
/// Semantics missing from `set` get zero-filled buffers so every slot binds.
pub(crate) fn create_geometry(device: &wgpu::Device, label: &str, set: &AttributeSet) -> GeometrySlot {
    let len = set.len();
    let buffers = Semantic::ALL
        .iter()
        .map(|&semantic| {
            let zeros;
            let data = match set.get(semantic) {
                Some(d) => d,
                None => {
                    zeros = vec![0.0f32; len * semantic.components()];
                    &zeros[..]
                }
            };
            // zero-sized vertex buffers can't be bound
            let contents: &[u8] = if data.is_empty() {
                &[0u8; 16]
            } else {
                bytemuck::cast_slice(data)
            };
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}_{}", semantic.name())),
                contents,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
            (semantic, buffer)
        })
        .collect();
    GeometrySlot { buffers, len }
}
