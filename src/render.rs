//! wgpu implementation of the scene backend.
//!
//! Every layer renders into an HDR target with a shared depth buffer, then
//! the post chain ping-pongs between two HDR targets (plus half-res bloom
//! buffers) and tonemaps into the swapchain.

mod helpers;
mod layers;
mod post;
mod targets;

use halo_core::shader::compose;
use halo_core::{
    AttributeSet, FramePlan, FxError, FxResult, GeometryHandle, GpuBackend, ProgramDesc, ProgramHandle,
    Semantic, POST_WGSL,
};
use layers::{GeometrySlot, ProgramSlot, Slab};
use post::{PostResources, Slot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use targets::RenderTargets;
use web_sys as web;

pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    targets: RenderTargets,
    linear_sampler: wgpu::Sampler,
    layer_bgl: wgpu::BindGroupLayout,
    programs: Slab<ProgramSlot>,
    geometries: Slab<GeometrySlot>,
    post: PostResources,
    lost: Arc<AtomicBool>,
    gpu_error: Arc<Mutex<Option<String>>>,
}

impl GpuState {
    pub async fn new(canvas: &web::HtmlCanvasElement) -> anyhow::Result<Self> {
        let width = canvas.width().max(1);
        let height = canvas.height().max(1);

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No WebGPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    // Use default limits on web to avoid passing unknown fields to older WebGPU impls
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!(format!("request_device error: {:?}", e)))?;

        let lost = Arc::new(AtomicBool::new(false));
        let lost_flag = lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            log::error!("[gpu] device lost ({:?}): {}", reason, message);
            lost_flag.store(true, Ordering::Relaxed);
        });
        let gpu_error = Arc::new(Mutex::new(None));
        let error_slot = gpu_error.clone();
        device.on_uncaptured_error(Box::new(move |err| {
            log::error!("[gpu] {}", err);
            if let Ok(mut slot) = error_slot.lock() {
                slot.get_or_insert_with(|| err.to_string());
            }
        }));

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let targets = RenderTargets::new(&device, width, height);
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        // post stages share the prelude's fullscreen helpers
        let post_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("post_shader"),
            source: wgpu::ShaderSource::Wgsl(compose(POST_WGSL).into()),
        });
        let post = post::create_post_resources(&device, &post_shader, format);
        let layer_bgl = layers::create_layer_bgl(&device);

        log::info!("[gpu] ready {}x{} format={:?}", width, height, format);
        Ok(Self {
            surface,
            device,
            queue,
            config,
            targets,
            linear_sampler,
            layer_bgl,
            programs: Slab::default(),
            geometries: Slab::default(),
            post,
            lost,
            gpu_error,
        })
    }

    fn check_health(&self) -> FxResult<()> {
        if self.lost.load(Ordering::Relaxed) {
            return Err(FxError::ContextLost);
        }
        let pending = self.gpu_error.lock().ok().and_then(|mut slot| slot.take());
        match pending {
            Some(msg) => Err(FxError::allocation("gpu", msg)),
            None => Ok(()),
        }
    }

    fn post_bind_groups(
        &self,
        stage: &post::PostStage,
        uniforms: &wgpu::Buffer,
        swap_view: &wgpu::TextureView,
    ) -> (wgpu::BindGroup, Option<wgpu::BindGroup>) {
        let source = slot_view(&self.targets, swap_view, stage.source);
        let bg0 = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("post_bg0"),
            layout: &self.post.bgl0,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniforms.as_entire_binding(),
                },
            ],
        });
        let bg1 = stage.bloom.map(|slot| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("post_bg1"),
                layout: &self.post.bgl1,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(slot_view(
                            &self.targets,
                            swap_view,
                            slot,
                        )),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                    },
                ],
            })
        });
        (bg0, bg1)
    }

    fn draw_scene(&self, encoder: &mut wgpu::CommandEncoder, plan: &FramePlan) {
        let [r, g, b] = plan.clear_color;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.targets.hdr[0].1,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: r as f64,
                        g: g as f64,
                        b: b as f64,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth.1,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        for draw in &plan.draws {
            let (Some(program), Some(geometry)) =
                (self.programs.get(draw.program.0), self.geometries.get(draw.geometry.0))
            else {
                log::warn!("[gpu] draw references released resources; skipped");
                continue;
            };
            pass.set_pipeline(&program.pipeline);
            pass.set_bind_group(0, &program.bind_group, &[]);
            let instances = if draw.topology.uses_instances() {
                for (slot, (_, buffer)) in geometry.buffers.iter().enumerate() {
                    pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                draw.instance_count.min(geometry.len as u32)
            } else {
                draw.instance_count
            };
            if instances > 0 {
                pass.draw(0..draw.vertex_count, 0..instances);
            }
        }
    }

    pub fn live_resources(&self) -> (usize, usize) {
        (self.programs.live(), self.geometries.live())
    }
}

fn slot_view<'a>(
    targets: &'a RenderTargets,
    swap_view: &'a wgpu::TextureView,
    slot: Slot,
) -> &'a wgpu::TextureView {
    match slot {
        Slot::Hdr(i) => &targets.hdr[i & 1].1,
        Slot::BloomA => &targets.bloom_a.1,
        Slot::BloomB => &targets.bloom_b.1,
        Slot::Swapchain => swap_view,
    }
}

impl GpuBackend for GpuState {
    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> FxResult<ProgramHandle> {
        self.check_health()?;
        let max_uniform = self.device.limits().max_uniform_buffer_binding_size as usize;
        if desc.uniform_size > max_uniform {
            return Err(FxError::allocation(
                desc.label,
                format!("uniform block of {} bytes exceeds {}", desc.uniform_size, max_uniform),
            ));
        }
        let slot = layers::create_program(&self.device, &self.layer_bgl, desc);
        Ok(ProgramHandle(self.programs.insert(slot)))
    }

    fn create_geometry(&mut self, label: &str, buffers: &AttributeSet) -> FxResult<GeometryHandle> {
        self.check_health()?;
        let max_bytes = self.device.limits().max_buffer_size;
        let widest = (buffers.len() * 3 * std::mem::size_of::<f32>()) as u64;
        if widest > max_bytes {
            return Err(FxError::allocation(
                label,
                format!("{} instances exceed the buffer limit", buffers.len()),
            ));
        }
        let slot = layers::create_geometry(&self.device, label, buffers);
        Ok(GeometryHandle(self.geometries.insert(slot)))
    }

    fn write_uniforms(&mut self, program: ProgramHandle, bytes: &[u8]) {
        let Some(slot) = self.programs.get(program.0) else {
            return;
        };
        let n = bytes.len().min(slot.uniform_size as usize) & !3;
        if n > 0 {
            self.queue.write_buffer(&slot.uniform_buffer, 0, &bytes[..n]);
        }
    }

    fn write_attribute(&mut self, geometry: GeometryHandle, semantic: Semantic, data: &[f32]) {
        let Some(buffer) = self.geometries.get(geometry.0).and_then(|g| g.buffer(semantic)) else {
            return;
        };
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.is_empty() || bytes.len() as u64 > buffer.size() {
            return;
        }
        self.queue.write_buffer(buffer, 0, bytes);
    }

    fn release_program(&mut self, program: ProgramHandle) {
        if let Some(slot) = self.programs.remove(program.0) {
            slot.uniform_buffer.destroy();
        }
    }

    fn release_geometry(&mut self, geometry: GeometryHandle) {
        if let Some(slot) = self.geometries.remove(geometry.0) {
            for (_, buffer) in slot.buffers {
                buffer.destroy();
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        let max = self.device.limits().max_texture_dimension_2d;
        let width = width.clamp(1, max);
        let height = height.clamp(1, max);
        if width == self.config.width && height == self.config.height {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.targets.recreate(&self.device, width, height);
        log::debug!("[gpu] resized to {}x{}", width, height);
    }

    fn render(&mut self, plan: &FramePlan) -> FxResult<()> {
        self.check_health()?;
        let frame = match self.surface.get_current_texture() {
            Ok(f) => f,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(FxError::ContextLost),
            Err(e) => {
                log::warn!("[gpu] frame skipped: {}", e);
                return Ok(());
            }
        };
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame"),
            });

        self.draw_scene(&mut encoder, plan);

        let stages = post::plan_stages(
            &plan.post,
            (self.targets.width, self.targets.height),
            self.targets.bloom_size(),
            plan.time,
            plan.exposure,
        );
        self.post.reserve_stages(&self.device, stages.len());
        for (i, stage) in stages.iter().enumerate() {
            let Some(uniforms) = self.post.stage_uniforms(i) else {
                continue;
            };
            self.queue
                .write_buffer(uniforms, 0, bytemuck::bytes_of(&stage.uniforms));
            let (bg0, bg1) = self.post_bind_groups(stage, uniforms, &swap_view);
            post::blit(
                &mut encoder,
                stage.pipeline,
                slot_view(&self.targets, &swap_view, stage.target),
                self.post.pipeline(stage.pipeline),
                &bg0,
                bg1.as_ref(),
            );
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

impl Drop for GpuState {
    fn drop(&mut self) {
        let (programs, geometries) = self.live_resources();
        if programs + geometries > 0 {
            log::warn!(
                "[gpu] dropped with {} programs and {} geometries still live",
                programs,
                geometries
            );
        }
    }
}
