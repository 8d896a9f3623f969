//! Page variants, mount configuration and the scene that owns every layer.

use crate::backend::{FramePlan, GpuBackend};
use crate::buffers::BufferGenerator;
use crate::camera::{CameraParams, CameraRig};
use crate::constants::CLEAR_COLOR;
use crate::effects::{CascadeSide, CloudMode, EffectKind};
use crate::error::{FxError, FxResult};
use crate::input::{InputState, TrackerParams};
use crate::layer::{Layer, LayerId, UniformFrame};
use crate::post::{BloomSettings, ChromaticSettings, PostChain, PostStep};
use crate::shader::ShaderRegistry;
use crate::uniforms::UniformStorage;
use glam::{Vec2, Vec3};
use smallvec::{smallvec, SmallVec};
use std::str::FromStr;

/// Largest magnitude accepted for `layer_order`.
pub const MAX_LAYER_ORDER: i32 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageVariant {
    /// Landing hero: rings, a repelling particle cloud and a cube cluster.
    Hero,
    /// Interactive ground grid with lanes and two cascade emitters.
    ParticleGrid,
    /// Background plus an attracting particle cloud.
    ParticleField,
    /// Noise background only.
    ShaderBackground,
}

impl PageVariant {
    pub const ALL: [PageVariant; 4] = [
        PageVariant::Hero,
        PageVariant::ParticleGrid,
        PageVariant::ParticleField,
        PageVariant::ShaderBackground,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PageVariant::Hero => "hero",
            PageVariant::ParticleGrid => "particle-grid",
            PageVariant::ParticleField => "particle-field",
            PageVariant::ShaderBackground => "shader-background",
        }
    }

    /// Layers and their base render order, back to front.
    pub fn layers(self) -> SmallVec<[(EffectKind, i32); 6]> {
        match self {
            PageVariant::Hero => smallvec![
                (EffectKind::BackgroundField, 0),
                (EffectKind::Rings, 10),
                (EffectKind::ParticleCloud(CloudMode::Repel), 20),
                (EffectKind::CubeCluster, 30),
            ],
            PageVariant::ParticleGrid => smallvec![
                (EffectKind::BackgroundField, 0),
                (EffectKind::GroundPlane, 10),
                (EffectKind::Lanes, 20),
                (EffectKind::Cascade(CascadeSide::Left), 30),
                (EffectKind::Cascade(CascadeSide::Right), 31),
            ],
            PageVariant::ParticleField => smallvec![
                (EffectKind::BackgroundField, 0),
                (EffectKind::ParticleCloud(CloudMode::Attract), 10),
            ],
            PageVariant::ShaderBackground => smallvec![(EffectKind::BackgroundField, 0)],
        }
    }

    pub fn post_chain(self) -> PostChain {
        match self {
            PageVariant::Hero => PostChain::empty()
                .with(PostStep::Bloom(BloomSettings::default()))
                .with(PostStep::ChromaticAberration(ChromaticSettings::default())),
            PageVariant::ParticleGrid | PageVariant::ParticleField => {
                PostChain::empty().with(PostStep::Bloom(BloomSettings::default()))
            }
            PageVariant::ShaderBackground => PostChain::empty(),
        }
    }

    pub fn camera_params(self) -> CameraParams {
        let base = CameraParams::default();
        match self {
            PageVariant::ParticleGrid => CameraParams {
                start_polar: 1.05,
                start_distance: 9.0,
                ..base
            },
            _ => base,
        }
    }
}

impl FromStr for PageVariant {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        PageVariant::ALL
            .into_iter()
            .find(|v| v.name() == key)
            .ok_or_else(|| FxError::config(format!("unknown effect variant `{}`", s.trim())))
    }
}

impl std::fmt::Display for PageVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Mount-time configuration chosen by the host page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectConfig {
    pub variant: PageVariant,
    pub enable_pointer_tracking: bool,
    pub enable_scroll_tracking: bool,
    /// Multiplies every layer's opacity; must be in [0, 1].
    pub opacity: f32,
    /// Added to every layer's render order.
    pub layer_order: i32,
    /// Pins the buffer generator for reproducible scenes.
    pub seed: Option<u64>,
}

impl EffectConfig {
    pub fn new(variant: PageVariant) -> Self {
        Self {
            variant,
            enable_pointer_tracking: true,
            enable_scroll_tracking: true,
            opacity: 1.0,
            layer_order: 0,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> FxResult<()> {
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(FxError::config(format!(
                "opacity {} outside [0, 1]",
                self.opacity
            )));
        }
        if self.layer_order.abs() > MAX_LAYER_ORDER {
            return Err(FxError::config(format!(
                "layerOrder {} outside [-{}, {}]",
                self.layer_order, MAX_LAYER_ORDER, MAX_LAYER_ORDER
            )));
        }
        Ok(())
    }

    /// Tracker settings consistent with this variant's camera limits.
    pub fn tracker_params(&self) -> TrackerParams {
        let cam = self.variant.camera_params();
        TrackerParams {
            min_distance: cam.min_distance,
            max_distance: cam.max_distance,
            start_distance: cam.start_distance,
            enable_pointer: self.enable_pointer_tracking,
            enable_scroll: self.enable_scroll_tracking,
            ..TrackerParams::default()
        }
    }

    pub fn generator(&self) -> BufferGenerator {
        match self.seed {
            Some(seed) => BufferGenerator::from_seed(seed),
            None => BufferGenerator::from_entropy(),
        }
    }
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self::new(PageVariant::Hero)
    }
}

/// Container size in CSS pixels plus the device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, pixel_ratio: f32) -> FxResult<Self> {
        if !width.is_finite() || !height.is_finite() || width < 0.0 || height < 0.0 {
            return Err(FxError::config(format!("viewport {}x{} is not a size", width, height)));
        }
        if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
            return Err(FxError::config(format!("pixel ratio {} must be positive", pixel_ratio)));
        }
        Ok(Self {
            width,
            height,
            pixel_ratio,
        })
    }

    /// Zero-area containers (hidden tabs, collapsed sections).
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Physical backing size, never smaller than 1x1.
    pub fn backing_size(&self) -> (u32, u32) {
        let w = (self.width * self.pixel_ratio).round().max(1.0) as u32;
        let h = (self.height * self.pixel_ratio).round().max(1.0) as u32;
        (w, h)
    }
}

/// Fixed lights copied into programs that declare lighting uniforms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightingRig {
    ambient: f32,
    key_direction: Vec3,
    key_color: Vec3,
}

impl LightingRig {
    pub fn new(ambient: f32, key_direction: Vec3, key_color: Vec3) -> Self {
        Self {
            ambient: ambient.clamp(0.0, 1.0),
            key_direction: key_direction.try_normalize().unwrap_or(Vec3::NEG_Y),
            key_color,
        }
    }

    pub fn ambient(&self) -> f32 {
        self.ambient
    }

    pub fn key_direction(&self) -> Vec3 {
        self.key_direction
    }

    pub fn key_color(&self) -> Vec3 {
        self.key_color
    }

    /// Returns true when the program consumed the lighting uniforms.
    pub fn apply(&self, uniforms: &mut UniformStorage) -> bool {
        let a = uniforms.set_if_declared("ambient", self.ambient);
        let d = uniforms.set_if_declared("key_direction", self.key_direction);
        let c = uniforms.set_if_declared("key_color", self.key_color);
        a && d && c
    }
}

impl Default for LightingRig {
    fn default() -> Self {
        Self::new(0.25, Vec3::new(-0.4, -1.0, -0.3), Vec3::new(1.0, 0.95, 0.9))
    }
}

/// All layers of one mounted page variant plus their camera, lights and post chain.
pub struct Scene {
    variant: PageVariant,
    layers: Vec<Layer>,
    camera: CameraRig,
    lighting: LightingRig,
    post: PostChain,
    viewport: Viewport,
    registry: ShaderRegistry,
    clear_color: [f32; 3],
}

impl Scene {
    /// Build and allocate every layer.
    ///
    /// If any step fails, everything allocated so far is released before the
    /// error is returned.
    pub fn mount(
        config: &EffectConfig,
        viewport: Viewport,
        generator: &mut BufferGenerator,
        backend: &mut dyn GpuBackend,
    ) -> FxResult<Self> {
        config.validate()?;
        let variant = config.variant;
        let mut camera = CameraRig::new(variant.camera_params());
        camera.set_aspect(viewport.width, viewport.height);
        let (bw, bh) = viewport.backing_size();
        backend.resize(bw, bh);

        let mut scene = Scene {
            variant,
            layers: Vec::new(),
            camera,
            lighting: LightingRig::default(),
            post: variant.post_chain(),
            viewport,
            registry: ShaderRegistry::new(),
            clear_color: CLEAR_COLOR,
        };

        for (index, (kind, order)) in variant.layers().into_iter().enumerate() {
            let id = LayerId(index as u32);
            let order = order.saturating_add(config.layer_order);
            let built = Layer::build(id, kind, order, config.opacity, &mut scene.registry, generator)
                .and_then(|mut layer| {
                    scene.lighting.apply(layer.program_mut().uniforms_mut());
                    layer
                        .program_mut()
                        .uniforms_mut()
                        .set_if_declared("resolution", Vec2::new(bw as f32, bh as f32));
                    layer.allocate(backend).map(|_| layer)
                });
            match built {
                Ok(layer) => scene.layers.push(layer),
                Err(e) => {
                    log::error!("[mount] {} layer {} failed: {}", variant, kind.label(), e);
                    scene.release_all(backend);
                    return Err(e);
                }
            }
        }
        scene.layers.sort_by_key(|l| l.render_order());
        log::info!(
            "[mount] {} with {} layers ({} primitives)",
            variant,
            scene.layers.len(),
            scene.layers.iter().map(|l| l.len()).sum::<usize>()
        );
        Ok(scene)
    }

    /// Release every layer's GPU resources.
    pub fn unmount(mut self, backend: &mut dyn GpuBackend) {
        self.release_all(backend);
        log::info!("[mount] {} unmounted", self.variant);
    }

    fn release_all(&mut self, backend: &mut dyn GpuBackend) {
        for layer in self.layers.iter_mut() {
            layer.release(backend);
        }
        self.layers.clear();
    }

    pub fn variant(&self) -> PageVariant {
        self.variant
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    /// `(effect, primitive count)` per layer in render order.
    pub fn layer_counts(&self) -> Vec<(EffectKind, usize)> {
        self.layers.iter().map(|l| (l.kind(), l.len())).collect()
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn lighting(&self) -> &LightingRig {
        &self.lighting
    }

    pub fn post(&self) -> &PostChain {
        &self.post
    }

    pub fn post_mut(&mut self) -> &mut PostChain {
        &mut self.post
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Apply a new container size; degenerate sizes keep the previous state.
    pub fn resize(&mut self, viewport: Viewport, backend: &mut dyn GpuBackend) {
        if viewport.is_degenerate() {
            log::debug!("[scene] ignoring degenerate resize {}x{}", viewport.width, viewport.height);
            return;
        }
        self.viewport = viewport;
        self.camera.set_aspect(viewport.width, viewport.height);
        let (bw, bh) = viewport.backing_size();
        backend.resize(bw, bh);
        let res = Vec2::new(bw as f32, bh as f32);
        for layer in self.layers.iter_mut() {
            layer.program_mut().uniforms_mut().set_if_declared("resolution", res);
        }
    }

    /// Camera and layer updates for one tick.
    pub fn update(&mut self, dt: f32, time: f32, input: &InputState) {
        self.camera.update(input);
        let (bw, bh) = self.viewport.backing_size();
        let frame = UniformFrame {
            time,
            pointer_ndc: input.pointer_ndc,
            resolution: Vec2::new(bw as f32, bh as f32),
            influence: input.influence,
            scroll: input.scroll_normalized,
            view_proj: self.camera.camera().view_proj(),
        };
        for layer in self.layers.iter_mut() {
            layer.begin_frame(&frame);
            layer.update(dt, input);
        }
    }

    /// Upload all dirty uniforms and attributes.
    pub fn flush(&mut self, backend: &mut dyn GpuBackend) {
        for layer in self.layers.iter_mut() {
            layer.flush(backend);
        }
    }

    pub fn frame_plan(&self, time: f32) -> FramePlan {
        FramePlan {
            clear_color: self.clear_color,
            time,
            draws: self.layers.iter().filter_map(|l| l.draw_call()).collect(),
            post: self.post.plan(),
            exposure: self.post.exposure,
        }
    }

    pub fn render(&self, backend: &mut dyn GpuBackend, time: f32) -> FxResult<()> {
        backend.render(&self.frame_plan(time))
    }
}
