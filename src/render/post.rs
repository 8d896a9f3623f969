use super::helpers::{make_post_pipeline, HDR_FORMAT};
use halo_core::PostUniforms;

/// Which pipeline a post stage runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PostPipeline {
    Bright,
    Blur,
    BloomAdd,
    Chroma,
    Present,
}

impl PostPipeline {
    fn label(self) -> &'static str {
        match self {
            PostPipeline::Bright => "bright_pass",
            PostPipeline::Blur => "blur_pass",
            PostPipeline::BloomAdd => "bloom_add_pass",
            PostPipeline::Chroma => "chroma_pass",
            PostPipeline::Present => "present_pass",
        }
    }
}

/// Texture slots a stage reads from or writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    Hdr(usize),
    BloomA,
    BloomB,
    Swapchain,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct PostStage {
    pub(crate) pipeline: PostPipeline,
    pub(crate) source: Slot,
    pub(crate) bloom: Option<Slot>,
    pub(crate) target: Slot,
    pub(crate) uniforms: PostUniforms,
}

pub(crate) struct PostResources {
    pub(crate) bgl0: wgpu::BindGroupLayout, // tex+sampler+uniform
    pub(crate) bgl1: wgpu::BindGroupLayout, // tex+sampler
    bright_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    bloom_add_pipeline: wgpu::RenderPipeline,
    chroma_pipeline: wgpu::RenderPipeline,
    present_pipeline: wgpu::RenderPipeline,
    /// One uniform buffer per stage of a frame; queue writes land before the
    /// submit, so stages must never share a buffer.
    uniform_pool: Vec<wgpu::Buffer>,
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

pub(crate) fn create_post_resources(
    device: &wgpu::Device,
    post_shader: &wgpu::ShaderModule,
    swap_format: wgpu::TextureFormat,
) -> PostResources {
    let bgl0 = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("post_bgl0"),
        entries: &[
            texture_entry(0),
            sampler_entry(1),
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });
    let bgl1 = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("post_bgl1"),
        entries: &[texture_entry(0), sampler_entry(1)],
    });
    let pl_single = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("pl_post_0"),
        bind_group_layouts: &[&bgl0],
        push_constant_ranges: &[],
    });
    let pl_dual = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("pl_post_bloom"),
        bind_group_layouts: &[&bgl0, &bgl1],
        push_constant_ranges: &[],
    });

    PostResources {
        bright_pipeline: make_post_pipeline(device, &pl_single, post_shader, "fs_bright", HDR_FORMAT),
        blur_pipeline: make_post_pipeline(device, &pl_single, post_shader, "fs_blur", HDR_FORMAT),
        bloom_add_pipeline: make_post_pipeline(device, &pl_dual, post_shader, "fs_bloom_add", HDR_FORMAT),
        chroma_pipeline: make_post_pipeline(device, &pl_single, post_shader, "fs_chroma", HDR_FORMAT),
        present_pipeline: make_post_pipeline(device, &pl_single, post_shader, "fs_present", swap_format),
        bgl0,
        bgl1,
        uniform_pool: Vec::new(),
    }
}

impl PostResources {
    pub(crate) fn pipeline(&self, which: PostPipeline) -> &wgpu::RenderPipeline {
        match which {
            PostPipeline::Bright => &self.bright_pipeline,
            PostPipeline::Blur => &self.blur_pipeline,
            PostPipeline::BloomAdd => &self.bloom_add_pipeline,
            PostPipeline::Chroma => &self.chroma_pipeline,
            PostPipeline::Present => &self.present_pipeline,
        }
    }

    /// Grow the uniform pool to at least `stages` buffers.
    pub(crate) fn reserve_stages(&mut self, device: &wgpu::Device, stages: usize) {
        while self.uniform_pool.len() < stages {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("post_uniforms"),
                size: std::mem::size_of::<PostUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.uniform_pool.push(buffer);
        }
    }

    pub(crate) fn stage_uniforms(&self, index: usize) -> Option<&wgpu::Buffer> {
        self.uniform_pool.get(index)
    }
}

/// Bloom is bright-pass into half res, separable blur, then add back.
pub(crate) fn plan_stages(
    steps: &[halo_core::PostStep],
    full: (u32, u32),
    half: (u32, u32),
    time: f32,
    exposure: f32,
) -> Vec<PostStage> {
    let full_res = [full.0 as f32, full.1 as f32];
    let half_res = [half.0 as f32, half.1 as f32];
    let mut stages = Vec::with_capacity(steps.len() * 4 + 1);
    let mut src = 0usize;
    for step in steps {
        match step {
            halo_core::PostStep::Bloom(_) => {
                let base = PostUniforms::for_step(step, half_res, time, exposure);
                stages.push(PostStage {
                    pipeline: PostPipeline::Bright,
                    source: Slot::Hdr(src),
                    bloom: None,
                    target: Slot::BloomA,
                    uniforms: base,
                });
                stages.push(PostStage {
                    pipeline: PostPipeline::Blur,
                    source: Slot::BloomA,
                    bloom: None,
                    target: Slot::BloomB,
                    uniforms: base.with_blur_dir([1.0, 0.0]),
                });
                stages.push(PostStage {
                    pipeline: PostPipeline::Blur,
                    source: Slot::BloomB,
                    bloom: None,
                    target: Slot::BloomA,
                    uniforms: base.with_blur_dir([0.0, 1.0]),
                });
                stages.push(PostStage {
                    pipeline: PostPipeline::BloomAdd,
                    source: Slot::Hdr(src),
                    bloom: Some(Slot::BloomA),
                    target: Slot::Hdr(1 - src),
                    uniforms: PostUniforms::for_step(step, full_res, time, exposure),
                });
                src = 1 - src;
            }
            halo_core::PostStep::ChromaticAberration(_) => {
                stages.push(PostStage {
                    pipeline: PostPipeline::Chroma,
                    source: Slot::Hdr(src),
                    bloom: None,
                    target: Slot::Hdr(1 - src),
                    uniforms: PostUniforms::for_step(step, full_res, time, exposure),
                });
                src = 1 - src;
            }
        }
    }
    stages.push(PostStage {
        pipeline: PostPipeline::Present,
        source: Slot::Hdr(src),
        bloom: None,
        target: Slot::Swapchain,
        uniforms: PostUniforms {
            resolution: full_res,
            time,
            exposure,
            ..PostUniforms::default()
        },
    });
    stages
}

pub(crate) fn blit(
    encoder: &mut wgpu::CommandEncoder,
    which: PostPipeline,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bg0: &wgpu::BindGroup,
    bg1: Option<&wgpu::BindGroup>,
) {
    let mut r = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(which.label()),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    r.set_pipeline(pipeline);
    r.set_bind_group(0, bg0, &[]);
    if let Some(g1) = bg1 {
        r.set_bind_group(1, g1, &[]);
    }
    r.draw(0..3, 0..1);
}
