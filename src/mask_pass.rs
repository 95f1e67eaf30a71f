//! Scan-mask pass: redraws overlay candidates with a flat unlit material.
//!
//! The mask only records *where* eligible objects are on screen; their normal
//! shading is ignored. The world-render pass later decides which of those
//! pixels the wavefront has reached.

use std::sync::Arc;

use glam::Mat4;

use crate::camera::Camera;
use crate::draw_buffer::DrawUniforms;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform, Vertex3d};
use crate::render_target::DEPTH_FORMAT;

/// Colour format of the scan-mask buffer and the world-render output.
pub const MASK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// An object handed to the effect for the current frame.
#[derive(Clone, Debug)]
pub struct Renderable {
    pub mesh: Arc<Mesh>,
    pub transform: Transform,
}

impl Renderable {
    pub fn new(mesh: Arc<Mesh>, transform: Transform) -> Self {
        Self { mesh, transform }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MaskCameraUniforms {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MaskModelUniforms {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

/// Draws silhouettes into the scan-mask buffer.
pub struct MaskPass {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    models: DrawUniforms<MaskModelUniforms>,
}

impl MaskPass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mask Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mask.wgsl").into()),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Mask Camera Uniforms"),
            size: std::mem::size_of::<MaskCameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Mask Camera Bind Group Layout"),
                entries: &[crate::blit::uniform_entry(0)],
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mask Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let models = DrawUniforms::new(gpu, "Mask Model Uniforms");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mask Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout, models.layout()],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mask Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: MASK_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            camera_buffer,
            camera_bind_group,
            models,
        }
    }

    /// Clears the mask to transparent black and its depth to the far plane.
    pub fn clear(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        mask: &wgpu::TextureView,
        depth: &wgpu::TextureView,
    ) {
        begin_mask_pass(
            encoder,
            "Mask Clear Pass",
            mask,
            depth,
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            wgpu::LoadOp::Clear(1.0),
        );
    }

    /// Accumulates `draws` into the mask on top of what is already there.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        camera: &Camera,
        aspect: f32,
        color: [f32; 4],
        draws: &[Renderable],
        mask: &wgpu::TextureView,
        depth: &wgpu::TextureView,
    ) {
        if draws.is_empty() {
            return;
        }

        let camera_uniforms = MaskCameraUniforms {
            view_proj: camera.view_projection(aspect).to_cols_array_2d(),
        };
        gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[camera_uniforms]),
        );

        let models: Vec<MaskModelUniforms> = draws
            .iter()
            .map(|draw| mask_model(draw.transform.matrix(), color))
            .collect();
        let offsets = self.models.upload(gpu, &models);

        let mut render_pass = begin_mask_pass(
            encoder,
            "Mask Pass",
            mask,
            depth,
            wgpu::LoadOp::Load,
            wgpu::LoadOp::Load,
        );

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

        for (draw, offset) in draws.iter().zip(offsets) {
            render_pass.set_bind_group(1, self.models.bind_group(), &[offset]);
            render_pass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
            render_pass
                .set_index_buffer(draw.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
        }
    }
}

fn mask_model(model: Mat4, color: [f32; 4]) -> MaskModelUniforms {
    MaskModelUniforms {
        model: model.to_cols_array_2d(),
        color,
    }
}

fn begin_mask_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    mask: &wgpu::TextureView,
    depth: &wgpu::TextureView,
    color_load: wgpu::LoadOp<wgpu::Color>,
    depth_load: wgpu::LoadOp<f32>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: mask,
            resolve_target: None,
            ops: wgpu::Operations {
                load: color_load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth,
            depth_ops: Some(wgpu::Operations {
                load: depth_load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}
