//! WGPU-based renderer implementation for pp

use super::pipeline::RenderPipeline;
use super::texture::VideoTexture;
use super::Letterbox;
use crate::decoder::VideoFrame;
use crate::utils::error::{IntoPlayerError, PlayerError, Result};
use log::{debug, info, warn};
use std::sync::Arc;
use winit::window::Window;

/// WGPU renderer implementation
pub struct WgpuRenderer {
    /// WGPU device
    device: wgpu::Device,

    /// WGPU queue for submitting commands
    queue: wgpu::Queue,

    /// Surface configuration
    surface_config: wgpu::SurfaceConfiguration,

    /// Render surface
    surface: wgpu::Surface<'static>,

    /// Render pipeline
    pipeline: RenderPipeline,

    /// Texture holding the current frame
    texture: VideoTexture,
}

impl WgpuRenderer {
    /// Create a renderer drawing into `window`
    pub fn new(window: Arc<Window>) -> Result<Self> {
        pollster::block_on(Self::init(window))
    }

    async fn init(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .renderer_err("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .renderer_err("Failed to find suitable GPU adapter")?;

        info!("Using GPU adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("pp GPU Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits()),
                ..Default::default()
            })
            .await
            .renderer_err("Failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| PlayerError::Renderer("Surface reports no formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let pipeline = RenderPipeline::new(&device, surface_format);
        let texture = VideoTexture::new(&device);

        Ok(Self {
            device,
            queue,
            surface_config,
            surface,
            pipeline,
            texture,
        })
    }

    /// Upload a frame to the GPU
    pub fn upload(&mut self, frame: &VideoFrame) -> Result<()> {
        if self.texture.upload(&self.device, &self.queue, frame)? {
            self.pipeline.invalidate_bind_group();
        }
        self.update_letterbox();
        Ok(())
    }

    /// Draw the last uploaded frame and present it
    pub fn present(&mut self) -> Result<()> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("Surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(PlayerError::Renderer("Out of GPU memory".to_string()));
            }
            Err(e) => {
                warn!("Surface texture acquisition failed: {:?}", e);
                return Ok(());
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        self.pipeline.render(&self.device, &mut encoder, &view, &self.texture);

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();

        Ok(())
    }

    /// Handle window resize
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.update_letterbox();
    }

    fn update_letterbox(&self) {
        let window = (self.surface_config.width, self.surface_config.height);
        let letterbox = match self.texture.dimensions() {
            Some(video) => Letterbox::fit(video, window),
            None => Letterbox::FULL,
        };
        self.pipeline.set_letterbox(&self.queue, letterbox);
    }
}
