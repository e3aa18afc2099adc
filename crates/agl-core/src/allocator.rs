use std::collections::HashMap;
use std::sync::Arc;

use crate::context::{RenderTarget, TargetAllocator, TargetId};
use crate::error::{RenderError, Result};

/// Texture format of actor cache targets.
pub const CACHE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Debug)]
pub struct OwnedTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub key: TexKey,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TexKey {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

impl TexKey {
    fn cache_target(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: CACHE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        }
    }
}

/// GPU cache targets with pooling by size.
///
/// Released textures go back to a pool keyed by their dimensions and are
/// handed out again for the next request of the same size.
pub struct WgpuTargetPool {
    device: Arc<wgpu::Device>,
    texture_pool: HashMap<TexKey, Vec<wgpu::Texture>>,
    live: HashMap<TargetId, OwnedTexture>,
    next_id: u64,
}

impl WgpuTargetPool {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self {
            device,
            texture_pool: HashMap::new(),
            live: HashMap::new(),
            next_id: 1,
        }
    }

    /// Texture backing a live target.
    pub fn texture(&self, id: TargetId) -> Option<&OwnedTexture> {
        self.live.get(&id)
    }

    /// Textures waiting in the pool for reuse.
    pub fn pooled(&self) -> usize {
        self.texture_pool.values().map(Vec::len).sum()
    }

    /// Drop every pooled texture that is not in use.
    pub fn trim(&mut self) {
        self.texture_pool.clear();
    }
}

impl TargetAllocator for WgpuTargetPool {
    fn create_target(&mut self, width: u32, height: u32) -> Result<RenderTarget> {
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RenderError::TargetAllocation {
                width,
                height,
                reason: format!("outside 1..={max}"),
            });
        }
        let key = TexKey::cache_target(width, height);
        let entry = self.texture_pool.entry(key).or_default();
        let texture = entry.pop().unwrap_or_else(|| {
            self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("agl:cache-target"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: key.format,
                usage: key.usage,
                view_formats: &[],
            })
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = TargetId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, OwnedTexture { texture, view, key });
        Ok(RenderTarget { id, width, height })
    }

    fn release_target(&mut self, target: RenderTarget) {
        match self.live.remove(&target.id) {
            Some(tex) => self.texture_pool.entry(tex.key).or_default().push(tex.texture),
            None => log::warn!("release of unknown gpu target {:?}", target.id),
        }
    }

    fn live_targets(&self) -> usize {
        self.live.len()
    }
}
