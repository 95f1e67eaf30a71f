//! Lit scene rendering into offscreen colour and depth targets.
//!
//! The holographic effect is a post-process: it needs the scene image and the
//! depth buffer it was drawn with as textures. [`ScenePass`] owns both and hands
//! them out as [`SceneInputs`] once the frame's geometry is drawn.
//!
//! # Bind groups
//!
//! - **Group 0**: camera uniforms (view-projection, camera position, time)
//! - **Group 1**: per-draw model uniforms, dynamic offset

use glam::Mat4;

use crate::camera::Camera;
use crate::compositor::SceneInputs;
use crate::draw_buffer::DrawUniforms;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform, Vertex3d};
use crate::render_target::{DEPTH_FORMAT, RenderTarget};

/// Background colour of the scene image.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.04,
    a: 1.0,
};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniforms {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 3],
    /// Elapsed time in seconds, for animated shaders.
    time: f32,
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ModelUniforms {
    model: [[f32; 4]; 4],
    /// Inverse transpose of `model`.
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
}

impl ModelUniforms {
    fn new(model: Mat4, color: [f32; 4]) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            color,
        }
    }
}

/// A mesh to draw into the scene this frame.
pub struct SceneDraw<'a> {
    pub mesh: &'a Mesh,
    pub transform: Transform,
    pub color: [f32; 4],
}

/// Draws meshes with simple diffuse lighting and keeps the result around as
/// textures.
pub struct ScenePass {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    models: DrawUniforms<ModelUniforms>,
    color: RenderTarget,
    depth: RenderTarget,
}

impl ScenePass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;
        let format = gpu.config.format;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Camera Bind Group Layout"),
                entries: &[crate::blit::uniform_entry(0)],
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let models = DrawUniforms::new(gpu, "Scene Model Uniforms");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout, models.layout()],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
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
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
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
            color: RenderTarget::new(gpu, format, "Scene Color"),
            depth: RenderTarget::depth(gpu, "Scene Depth"),
        }
    }

    /// Clears the scene targets and draws `draws` into them.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        camera: &Camera,
        time: f32,
        draws: &[SceneDraw],
    ) {
        self.color.ensure_size(gpu);
        self.depth.ensure_size(gpu);

        let camera_uniforms = CameraUniforms {
            view_proj: camera.view_projection(gpu.aspect()).to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            time,
        };
        gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[camera_uniforms]),
        );

        let models: Vec<ModelUniforms> = draws
            .iter()
            .map(|draw| ModelUniforms::new(draw.transform.matrix(), draw.color))
            .collect();
        let offsets = self.models.upload(gpu, &models);

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.color.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

        for (draw, offset) in draws.iter().zip(offsets) {
            render_pass.set_bind_group(1, self.models.bind_group(), &[offset]);
            render_pass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(draw.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
        }
    }

    /// The targets written by the last [`render`](Self::render).
    pub fn inputs(&self) -> SceneInputs<'_> {
        SceneInputs {
            color: &self.color.view,
            depth: &self.depth.view,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3, Vec4};

    #[test]
    fn normal_matrix_keeps_normals_perpendicular_under_scale() {
        let transform = Transform::new()
            .rotation(Quat::from_rotation_y(0.3))
            .uniform_scale(2.0);
        let u = ModelUniforms::new(transform.matrix(), [1.0; 4]);

        let normal_matrix = Mat4::from_cols_array_2d(&u.normal_matrix);
        let model = Mat4::from_cols_array_2d(&u.model);
        let tangent = (model * Vec4::new(1.0, 0.0, 0.0, 0.0)).truncate();
        let normal = (normal_matrix * Vec4::new(0.0, 1.0, 0.0, 0.0)).truncate();
        assert!(tangent.dot(normal).abs() < 1e-5);
        assert!(normal.normalize().abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn uniform_layouts_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<CameraUniforms>(), 80);
        assert_eq!(std::mem::size_of::<ModelUniforms>(), 144);
    }
}
