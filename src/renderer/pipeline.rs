//! Render pipeline setup for video rendering
//!
//! The quad has no vertex buffer: the shader derives its four corners from
//! the vertex index and scales them by the letterbox uniform.

use super::texture::VideoTexture;
use super::Letterbox;
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Vertices in the triangle strip
const QUAD_VERTICES: u32 = 4;

/// Uniform block matching `Letterbox` in video.wgsl
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct LetterboxUniform {
    scale: [f32; 2],
    _padding: [f32; 2],
}

impl From<Letterbox> for LetterboxUniform {
    fn from(letterbox: Letterbox) -> Self {
        Self {
            scale: [letterbox.scale_x, letterbox.scale_y],
            _padding: [0.0; 2],
        }
    }
}

fn layout_entry(binding: u32, visibility: wgpu::ShaderStages, ty: wgpu::BindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty,
        count: None,
    }
}

/// Render pipeline for video rendering
pub struct RenderPipeline {
    pipeline: wgpu::RenderPipeline,
    letterbox_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,

    /// Recreated when the texture changes
    bind_group: Option<wgpu::BindGroup>,
}

impl RenderPipeline {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pp video shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/video.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pp frame layout"),
            entries: &[
                layout_entry(
                    0,
                    wgpu::ShaderStages::VERTEX,
                    wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                ),
                layout_entry(
                    1,
                    wgpu::ShaderStages::FRAGMENT,
                    wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                ),
                layout_entry(
                    2,
                    wgpu::ShaderStages::FRAGMENT,
                    wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                ),
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pp video layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pp video pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(surface_format.into())],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let letterbox_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pp letterbox"),
            contents: bytemuck::bytes_of(&LetterboxUniform::from(Letterbox::FULL)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            pipeline,
            letterbox_buffer,
            bind_group_layout,
            bind_group: None,
        }
    }

    /// Write the letterbox scale for the next draw
    pub fn set_letterbox(&self, queue: &wgpu::Queue, letterbox: Letterbox) {
        let uniform = LetterboxUniform::from(letterbox);
        queue.write_buffer(&self.letterbox_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Forget the bind group; the texture it points at was replaced
    pub fn invalidate_bind_group(&mut self) {
        self.bind_group = None;
    }

    fn bind(&self, device: &wgpu::Device, view: &wgpu::TextureView, sampler: &wgpu::Sampler) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pp frame bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.letterbox_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    /// Clear `target` to black and draw the video quad if a frame exists
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        texture: &VideoTexture,
    ) {
        if self.bind_group.is_none() {
            self.bind_group = texture
                .binding()
                .map(|(view, sampler)| self.bind(device, view, sampler));
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pp video pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            ..Default::default()
        });

        // Bars stay black: only the scaled quad is drawn over the clear
        if let Some(bind_group) = &self.bind_group {
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..QUAD_VERTICES, 0..1);
        }
    }
}
