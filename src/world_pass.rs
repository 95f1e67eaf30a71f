//! World-render pass: turns the scan mask into the wavefront image.
//!
//! Each pixel's world position is rebuilt from scene depth, its distance to the
//! trigger point is compared with the current wavefront radius, and three
//! channels are written to a temporary target for the overlay pass:
//! wavefront edge (r), revealed silhouette (g) and swept-region glow (b).
//!
//! Two reconstruction strategies are supported, selected by
//! [`Reconstruction`]:
//!
//! - **Frustum corners**: the four far-plane corner rays are uploaded as the
//!   columns of a matrix; the shader interpolates them by screen UV and scales
//!   by linear depth. No per-pixel matrix multiply.
//! - **Camera depth**: NDC depth is unprojected with the inverse projection and
//!   moved to world space with the camera-to-world matrix.

use crate::blit::{fullscreen_pipeline, sampler_entry, screen_sampler, texture_entry, uniform_entry};
use crate::camera::Camera;
use crate::config::{EffectConfig, Reconstruction};
use crate::fade::FadeFactors;
use crate::gpu::GpuContext;
use crate::mask_pass::MASK_FORMAT;
use crate::timer::EffectState;

/// Uniforms for `world_render.wgsl`.
///
/// # WGSL Declaration
///
/// ```wgsl
/// struct WorldUniforms {
///     camera_to_world: mat4x4f,
///     inverse_projection: mat4x4f,
///     frustum_corners: mat4x4f,
///     camera_pos: vec3f,
///     mode: u32,
///     center: vec3f,
///     _pad: f32,
///     wave: vec4f,
///     fade: vec4f,
///     clip: vec4f,
/// }
/// ```
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WorldUniforms {
    pub camera_to_world: [[f32; 4]; 4],
    pub inverse_projection: [[f32; 4]; 4],
    /// Columns: bottom-left, bottom-right, top-right, top-left.
    pub frustum_corners: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    /// 0 for frustum corners, 1 for camera depth.
    pub mode: u32,
    /// Trigger position of the current scan.
    pub center: [f32; 3],
    pub _pad: f32,
    /// `[radius * scan_elapsed, fade, fade_width, 1.0]`
    pub wave: [f32; 4],
    /// `[scan_fade, display_fade, 1.0, 1.0]`
    pub fade: [f32; 4],
    /// `[near, far, width, height]`
    pub clip: [f32; 4],
}

impl WorldUniforms {
    pub const MODE_FRUSTUM_CORNERS: u32 = 0;
    pub const MODE_CAMERA_DEPTH: u32 = 1;

    pub fn new(
        camera: &Camera,
        resolution: (u32, u32),
        state: &EffectState,
        config: &EffectConfig,
        fades: FadeFactors,
    ) -> Self {
        let (width, height) = resolution;
        let aspect = width.max(1) as f32 / height.max(1) as f32;

        let mode = match config.reconstruction {
            Reconstruction::FrustumCorners => Self::MODE_FRUSTUM_CORNERS,
            Reconstruction::CameraDepth => Self::MODE_CAMERA_DEPTH,
        };

        Self {
            camera_to_world: camera.camera_to_world().to_cols_array_2d(),
            inverse_projection: camera.projection_matrix(aspect).inverse().to_cols_array_2d(),
            frustum_corners: camera.frustum_corners(aspect).to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            mode,
            center: state.trigger_position.to_array(),
            _pad: 0.0,
            wave: [
                config.radius * state.scan_elapsed,
                config.fade,
                config.fade_width,
                1.0,
            ],
            fade: [fades.scan, fades.display, 1.0, 1.0],
            clip: [camera.near, camera.far, width as f32, height as f32],
        }
    }
}

/// Fullscreen pass running `world_render.wgsl`.
pub struct WorldRenderPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl WorldRenderPass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("World Render Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/world_render.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("World Render Uniforms"),
            size: std::mem::size_of::<WorldUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("World Render Bind Group Layout"),
            entries: &[
                uniform_entry(0),
                // Scan mask
                texture_entry(1),
                sampler_entry(2),
                // Scene depth
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let pipeline = fullscreen_pipeline(
            device,
            "World Render Pipeline",
            &shader,
            &bind_group_layout,
            MASK_FORMAT,
        );

        Self {
            pipeline,
            uniform_buffer,
            bind_group_layout,
            sampler: screen_sampler(device, "World Render Sampler"),
        }
    }

    /// Renders the mask through the world shader into the current pass target.
    pub fn render(
        &self,
        gpu: &GpuContext,
        render_pass: &mut wgpu::RenderPass,
        uniforms: &WorldUniforms,
        mask: &wgpu::TextureView,
        scene_depth: &wgpu::TextureView,
    ) {
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("World Render Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(mask),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(scene_depth),
                },
            ],
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3, Vec4};

    fn scanning_state(elapsed: f32) -> EffectState {
        EffectState {
            trigger_position: Vec3::new(1.0, 0.0, -2.0),
            scan_elapsed: elapsed,
            is_scanning: true,
            display_elapsed: elapsed,
            is_displaying: true,
        }
    }

    #[test]
    fn layout_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<WorldUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<WorldUniforms>(), 64 * 3 + 16 * 5);
    }

    #[test]
    fn wave_parameters_follow_state() {
        let config = EffectConfig {
            radius: 4.0,
            fade: 0.75,
            fade_width: 0.25,
            ..EffectConfig::default()
        };
        let state = scanning_state(1.5);
        let fades = FadeFactors::evaluate(&state, &config);
        let u = WorldUniforms::new(&Camera::default(), (800, 600), &state, &config, fades);

        assert_eq!(u.wave, [6.0, 0.75, 0.25, 1.0]);
        assert_eq!(u.center, [1.0, 0.0, -2.0]);
        assert_eq!(u.fade[0], fades.scan);
        assert_eq!(u.fade[1], fades.display);
        assert_eq!([u.clip[2], u.clip[3]], [800.0, 600.0]);
    }

    #[test]
    fn mode_tracks_reconstruction() {
        let state = scanning_state(0.5);
        let camera = Camera::default();

        let corners = EffectConfig::default();
        let u = WorldUniforms::new(&camera, (4, 4), &state, &corners, FadeFactors::default());
        assert_eq!(u.mode, WorldUniforms::MODE_FRUSTUM_CORNERS);

        let depth = EffectConfig {
            reconstruction: Reconstruction::CameraDepth,
            ..EffectConfig::default()
        };
        let u = WorldUniforms::new(&camera, (4, 4), &state, &depth, FadeFactors::default());
        assert_eq!(u.mode, WorldUniforms::MODE_CAMERA_DEPTH);
    }

    /// Mirrors the shader's two reconstruction paths on the CPU.
    fn reconstruct(u: &WorldUniforms, uv: (f32, f32), depth: f32) -> Vec3 {
        let (near, far) = (u.clip[0], u.clip[1]);
        if u.mode == WorldUniforms::MODE_FRUSTUM_CORNERS {
            let c = Mat4::from_cols_array_2d(&u.frustum_corners);
            let bottom = c.x_axis.lerp(c.y_axis, uv.0);
            let top = c.w_axis.lerp(c.z_axis, uv.0);
            let ray = top.lerp(bottom, uv.1).truncate();
            let linear = near * far / (far - depth * (far - near));
            Vec3::from(u.camera_pos) + ray * (linear / far)
        } else {
            let ndc = Vec4::new(uv.0 * 2.0 - 1.0, 1.0 - uv.1 * 2.0, depth, 1.0);
            let view = Mat4::from_cols_array_2d(&u.inverse_projection) * ndc;
            let view = view / view.w;
            (Mat4::from_cols_array_2d(&u.camera_to_world) * view).truncate()
        }
    }

    #[test]
    fn both_strategies_recover_the_same_point() {
        let camera = Camera::new()
            .at(Vec3::new(2.0, 3.0, 6.0))
            .looking_at(Vec3::ZERO)
            .with_clip(0.1, 50.0);
        let resolution = (1280, 720);
        let aspect = 1280.0 / 720.0;
        let target = Vec3::new(0.5, 0.25, -1.0);

        let ndc = camera.project_to_ndc(target, aspect).unwrap();
        let uv = (ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
        let state = scanning_state(1.0);

        for reconstruction in [Reconstruction::FrustumCorners, Reconstruction::CameraDepth] {
            let config = EffectConfig {
                reconstruction,
                ..EffectConfig::default()
            };
            let u = WorldUniforms::new(&camera, resolution, &state, &config, FadeFactors::default());
            let world = reconstruct(&u, uv, ndc.z);
            assert!(
                (world - target).length() < 1e-2,
                "{reconstruction:?} reconstructed {world:?}"
            );
        }
    }
}
