//! Texture management for video frames
//!
//! Frames arrive as tightly packed RGBA, so a single texture is enough. It is
//! recreated whenever the frame size changes.

use crate::decoder::VideoFrame;
use crate::utils::error::{PlayerError, Result};

/// GPU texture holding the current frame
pub struct VideoTexture {
    /// RGBA texture, created on first upload
    texture: Option<wgpu::Texture>,

    /// View of `texture`
    view: Option<wgpu::TextureView>,

    /// Texture sampler
    sampler: wgpu::Sampler,

    /// Current texture dimensions
    dimensions: Option<(u32, u32)>,
}

impl VideoTexture {
    pub fn new(device: &wgpu::Device) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Video Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture: None,
            view: None,
            sampler,
            dimensions: None,
        }
    }

    /// Upload a frame, returning true if the texture had to be recreated
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, frame: &VideoFrame) -> Result<bool> {
        let expected = frame.stride() * frame.height as usize;
        if frame.width == 0 || frame.height == 0 || frame.data.len() < expected {
            return Err(PlayerError::Renderer(format!(
                "Frame {}x{} has {} bytes, expected {}",
                frame.width,
                frame.height,
                frame.data.len(),
                expected
            )));
        }

        let dimensions = (frame.width, frame.height);
        let recreated = self.dimensions != Some(dimensions);
        if recreated {
            self.create(device, dimensions);
        }

        let texture = self
            .texture
            .as_ref()
            .ok_or_else(|| PlayerError::Renderer("Video texture not initialized".to_string()))?;

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame.data[..expected],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(frame.stride() as u32),
                rows_per_image: Some(frame.height),
            },
            wgpu::Extent3d {
                width: frame.width,
                height: frame.height,
                depth_or_array_layers: 1,
            },
        );

        Ok(recreated)
    }

    fn create(&mut self, device: &wgpu::Device, (width, height): (u32, u32)) {
        log::debug!("Creating {}x{} video texture", width, height);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Video Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        self.texture = Some(texture);
        self.dimensions = Some((width, height));
    }

    /// View and sampler for binding, once a frame has been uploaded
    pub fn binding(&self) -> Option<(&wgpu::TextureView, &wgpu::Sampler)> {
        self.view.as_ref().map(|view| (view, &self.sampler))
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }
}
