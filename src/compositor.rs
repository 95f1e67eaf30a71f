//! Per-frame orchestration of the holographic passes.
//!
//! The host drives a [`Compositor`] in a fixed order every frame:
//!
//! 1. [`begin_frame`](Compositor::begin_frame): resize offscreen targets if the
//!    viewport changed, clear the scan mask, forget last frame's draws.
//! 2. [`submit_mask_draw`](Compositor::submit_mask_draw): queue each object the
//!    visibility gate approved.
//! 3. [`composite`](Compositor::composite): either copy the scene image through
//!    untouched, or run mask → world-render → overlay into the output target.
//!
//! ```ignore
//! compositor.begin_frame(&gpu, &mut encoder);
//! for object in approved {
//!     compositor.submit_mask_draw(object);
//! }
//! compositor.composite(&gpu, &mut encoder, &camera, state, &config, scene, &surface_view);
//! ```

use crate::blit::{Blit, begin_fullscreen_pass};
use crate::camera::Camera;
use crate::config::EffectConfig;
use crate::error::HoloError;
use crate::fade::FadeFactors;
use crate::gpu::GpuContext;
use crate::mask_pass::{MASK_FORMAT, MaskPass, Renderable};
use crate::overlay_pass::{OverlayPass, OverlayUniforms};
use crate::render_target::{RenderTarget, TargetPool};
use crate::texture::Texture;
use crate::timer::EffectState;
use crate::world_pass::{WorldRenderPass, WorldUniforms};

/// The scene image the effect composites over.
#[derive(Clone, Copy)]
pub struct SceneInputs<'a> {
    pub color: &'a wgpu::TextureView,
    /// Depth buffer the scene was rendered with (`Depth32Float`).
    pub depth: &'a wgpu::TextureView,
}

/// What `composite` will do for a given state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CompositePlan {
    PassThrough,
    Holographic(FadeFactors),
}

impl CompositePlan {
    pub fn for_state(state: &EffectState, config: &EffectConfig) -> Self {
        if state.is_active() {
            CompositePlan::Holographic(FadeFactors::evaluate(state, config))
        } else {
            CompositePlan::PassThrough
        }
    }
}

/// What `composite` actually wrote to the output target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeOutcome {
    /// The scene image was copied unchanged.
    PassThrough,
    /// The holographic overlay was composited over the scene.
    Holographic,
    /// The effect is disabled and nothing was written; the host must present
    /// the scene itself.
    Disabled,
}

/// Owns the offscreen buffers and the passes of one effect.
pub struct Compositor {
    mask: RenderTarget,
    mask_depth: RenderTarget,
    temporaries: TargetPool<RenderTarget>,
    mask_pass: MaskPass,
    world_pass: WorldRenderPass,
    overlay_pass: OverlayPass,
    blit: Blit,
    pending: Vec<Renderable>,
    mask_color: [f32; 4],
    mask_cleared: bool,
}

impl Compositor {
    /// Builds every pass and the persistent mask buffers.
    ///
    /// `output_format` is the format of the target `composite` writes into,
    /// usually the surface format. Fails if the GPU rejects any of the
    /// shaders. An overlay image that cannot be loaded is replaced by the
    /// scanline tile.
    pub fn new(
        gpu: &GpuContext,
        config: &EffectConfig,
        output_format: wgpu::TextureFormat,
    ) -> Result<Self, HoloError> {
        let effect_texture = Texture::overlay(gpu, config.overlay_texture.as_deref());

        let (mask_pass, world_pass, overlay_pass, blit) =
            gpu.validated("holographic passes", |_| {
                (
                    MaskPass::new(gpu),
                    WorldRenderPass::new(gpu),
                    OverlayPass::new(gpu, effect_texture, output_format),
                    Blit::new(gpu, output_format),
                )
            })?;

        tracing::info!(
            width = gpu.width(),
            height = gpu.height(),
            reconstruction = ?config.reconstruction,
            "holographic compositor ready"
        );

        Ok(Self {
            mask: RenderTarget::new(gpu, MASK_FORMAT, "Scan Mask"),
            mask_depth: RenderTarget::depth(gpu, "Scan Mask Depth"),
            temporaries: TargetPool::new(),
            mask_pass,
            world_pass,
            overlay_pass,
            blit,
            pending: Vec::new(),
            mask_color: config.mask_color,
            mask_cleared: false,
        })
    }

    /// Starts a frame: matches the viewport and clears the scan mask.
    pub fn begin_frame(&mut self, gpu: &GpuContext, encoder: &mut wgpu::CommandEncoder) {
        let resized = self.mask.ensure_size(gpu) | self.mask_depth.ensure_size(gpu);
        if resized {
            self.temporaries.clear();
        }

        self.pending.clear();
        self.mask_pass
            .clear(encoder, &self.mask.view, &self.mask_depth.view);
        self.mask_cleared = true;
    }

    /// Queues an object for the mask pass of the current frame.
    pub fn submit_mask_draw(&mut self, draw: Renderable) {
        self.pending.push(draw);
    }

    /// Copies the scene into `target` unchanged and drops the queued draws.
    pub fn pass_through(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        scene: SceneInputs,
        target: &wgpu::TextureView,
    ) -> CompositeOutcome {
        self.pending.clear();
        self.mask_cleared = false;
        self.blit.copy(gpu, encoder, scene.color, target);
        CompositeOutcome::PassThrough
    }

    /// Writes the final image for this frame into `target`.
    ///
    /// Queued draws are consumed either way. The temporary world-render target
    /// goes back to the pool when this returns.
    #[allow(clippy::too_many_arguments)]
    pub fn composite(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        camera: &Camera,
        state: &EffectState,
        config: &EffectConfig,
        scene: SceneInputs,
        target: &wgpu::TextureView,
    ) -> CompositeOutcome {
        let draws = std::mem::take(&mut self.pending);
        let mask_cleared = std::mem::replace(&mut self.mask_cleared, false);

        let fades = match CompositePlan::for_state(state, config) {
            CompositePlan::PassThrough => {
                return self.pass_through(gpu, encoder, scene, target);
            }
            CompositePlan::Holographic(fades) => fades,
        };

        if !mask_cleared {
            self.mask.ensure_size(gpu);
            self.mask_depth.ensure_size(gpu);
            self.mask_pass
                .clear(encoder, &self.mask.view, &self.mask_depth.view);
        }

        let resolution = self.mask.size();
        let aspect = resolution.0.max(1) as f32 / resolution.1.max(1) as f32;

        self.mask_pass.render(
            gpu,
            encoder,
            camera,
            aspect,
            self.mask_color,
            &draws,
            &self.mask.view,
            &self.mask_depth.view,
        );

        let pre = self.temporaries.acquire(resolution, || {
            RenderTarget::new(gpu, MASK_FORMAT, "Holographic Temporary")
        });

        let world_uniforms = WorldUniforms::new(camera, resolution, state, config, fades);
        {
            let mut render_pass = begin_fullscreen_pass(encoder, "World Render Pass", &pre.view);
            self.world_pass.render(
                gpu,
                &mut render_pass,
                &world_uniforms,
                &self.mask.view,
                scene.depth,
            );
        }

        let overlay_uniforms = OverlayUniforms::new(resolution, config, state.display_elapsed);
        {
            let mut render_pass = begin_fullscreen_pass(encoder, "Holographic Pass", target);
            self.overlay_pass.render(
                gpu,
                &mut render_pass,
                &overlay_uniforms,
                scene.color,
                &pre.view,
            );
        }

        CompositeOutcome::Holographic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn idle_state_passes_through() {
        let config = EffectConfig::default();
        let state = EffectState::default();
        assert_eq!(
            CompositePlan::for_state(&state, &config),
            CompositePlan::PassThrough
        );
    }

    #[test]
    fn display_only_still_composites() {
        let config = EffectConfig::default();
        let state = EffectState {
            trigger_position: Vec3::ZERO,
            scan_elapsed: 2.5,
            is_scanning: false,
            display_elapsed: 2.5,
            is_displaying: true,
        };
        match CompositePlan::for_state(&state, &config) {
            CompositePlan::Holographic(fades) => {
                assert_eq!(fades.scan, 0.0);
                assert_eq!(fades.display, 1.0);
            }
            other => panic!("expected holographic plan, got {other:?}"),
        }
    }

    #[test]
    fn scanning_composites_with_both_fades() {
        let config = EffectConfig {
            max_scan_time: 2.0,
            fade_scan_time: 1.0,
            max_display_time: 4.0,
            fade_out_time: 3.0,
            ..EffectConfig::default()
        };
        let state = EffectState {
            trigger_position: Vec3::ZERO,
            scan_elapsed: 1.5,
            is_scanning: true,
            display_elapsed: 3.5,
            is_displaying: true,
        };
        let CompositePlan::Holographic(fades) = CompositePlan::for_state(&state, &config) else {
            panic!("expected holographic plan");
        };
        assert!((fades.scan - 0.5).abs() < 1e-6);
        assert!((fades.display - 0.5).abs() < 1e-6);
    }
}
