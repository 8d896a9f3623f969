use super::helpers::{self, HDR_FORMAT};

/// Offscreen targets for the scene and post chain.
///
/// - `hdr[0]` receives the scene, `hdr[1]` is its ping-pong partner.
/// - `bloom_*` are half-res buffers used for bright-pass and blur.
/// - `depth` matches the full-res size.
pub(crate) struct RenderTargets {
    pub(crate) hdr: [(wgpu::Texture, wgpu::TextureView); 2],
    pub(crate) bloom_a: (wgpu::Texture, wgpu::TextureView),
    pub(crate) bloom_b: (wgpu::Texture, wgpu::TextureView),
    pub(crate) depth: (wgpu::Texture, wgpu::TextureView),
    pub(crate) width: u32,
    pub(crate) height: u32,
}

const SAMPLED_TARGET: wgpu::TextureUsages =
    wgpu::TextureUsages::RENDER_ATTACHMENT.union(wgpu::TextureUsages::TEXTURE_BINDING);

impl RenderTargets {
    pub(crate) fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let (bw, bh) = bloom_size(width, height);
        Self {
            hdr: [
                helpers::create_color_texture(device, "hdr_a", width, height, HDR_FORMAT, SAMPLED_TARGET),
                helpers::create_color_texture(device, "hdr_b", width, height, HDR_FORMAT, SAMPLED_TARGET),
            ],
            bloom_a: helpers::create_color_texture(device, "bloom_a", bw, bh, HDR_FORMAT, SAMPLED_TARGET),
            bloom_b: helpers::create_color_texture(device, "bloom_b", bw, bh, HDR_FORMAT, SAMPLED_TARGET),
            depth: helpers::create_depth_texture(device, width, height),
            width,
            height,
        }
    }

    pub(crate) fn recreate(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.width == width.max(1) && self.height == height.max(1) {
            return;
        }
        *self = Self::new(device, width, height);
    }

    pub(crate) fn bloom_size(&self) -> (u32, u32) {
        bloom_size(self.width, self.height)
    }
}

fn bloom_size(width: u32, height: u32) -> (u32, u32) {
    ((width.max(1) / 2).max(1), (height.max(1) / 2).max(1))
}
