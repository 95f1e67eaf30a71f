//! Final holographic composite over the scene image.

use crate::blit::{fullscreen_pipeline, sampler_entry, screen_sampler, texture_entry, uniform_entry};
use crate::config::EffectConfig;
use crate::gpu::GpuContext;
use crate::texture::Texture;

/// Uniforms for `holographic.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayUniforms {
    /// How many times the overlay texture repeats across the viewport.
    pub effect_scale: [f32; 2],
    /// Seconds into the display phase, scrolls the overlay.
    pub time: f32,
    pub _pad: f32,
    pub color: [f32; 4],
}

impl OverlayUniforms {
    pub fn new(resolution: (u32, u32), config: &EffectConfig, time: f32) -> Self {
        Self {
            effect_scale: [
                resolution.0 as f32 / config.effect_scale,
                resolution.1 as f32 / config.effect_scale,
            ],
            time,
            _pad: 0.0,
            color: config.overlay_color,
        }
    }
}

/// Fullscreen pass running `holographic.wgsl`.
///
/// Inputs: the scene image, the world-render output, and the tiled overlay
/// texture owned by this pass.
pub struct OverlayPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    effect_texture: Texture,
}

impl OverlayPass {
    pub fn new(gpu: &GpuContext, effect_texture: Texture, format: wgpu::TextureFormat) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Holographic Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/holographic.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Holographic Uniforms"),
            size: std::mem::size_of::<OverlayUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Holographic Bind Group Layout"),
            entries: &[
                uniform_entry(0),
                // Scene image
                texture_entry(1),
                // World-render output
                texture_entry(2),
                sampler_entry(3),
                // Overlay texture and its repeating sampler
                texture_entry(4),
                sampler_entry(5),
            ],
        });

        let pipeline = fullscreen_pipeline(
            device,
            "Holographic Pipeline",
            &shader,
            &bind_group_layout,
            format,
        );

        Self {
            pipeline,
            uniform_buffer,
            bind_group_layout,
            sampler: screen_sampler(device, "Holographic Sampler"),
            effect_texture,
        }
    }

    pub fn render(
        &self,
        gpu: &GpuContext,
        render_pass: &mut wgpu::RenderPass,
        uniforms: &OverlayUniforms,
        scene: &wgpu::TextureView,
        pre: &wgpu::TextureView,
    ) {
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Holographic Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(scene),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(pre),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&self.effect_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&self.effect_texture.sampler),
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

    #[test]
    fn tiling_divides_viewport_by_effect_scale() {
        let config = EffectConfig::default();
        let u = OverlayUniforms::new((1920, 1080), &config, 0.0);
        assert_eq!(u.effect_scale, [192.0, 108.0]);

        let config = EffectConfig {
            effect_scale: 40.0,
            ..EffectConfig::default()
        };
        let u = OverlayUniforms::new((800, 600), &config, 1.5);
        assert_eq!(u.effect_scale, [20.0, 15.0]);
        assert_eq!(u.time, 1.5);
    }

    #[test]
    fn layout_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<OverlayUniforms>(), 32);
    }
}
