//! # Holoscan
//!
//! **A holographic scan post-process for wgpu scenes.**
//!
//! A trigger starts a spherical wavefront expanding from a world position.
//! Objects offered to the effect are drawn into a scan mask, the wavefront is
//! reconstructed per pixel from scene depth, and a tiled overlay is
//! composited over the scene where the wave has passed. Scan and display
//! phases fade out on their own clocks.
//!
//! ## Quick Start
//!
//! ```no_run
//! use holoscan::*;
//!
//! # fn frame(gpu: &GpuContext, scene: &mut ScenePass, cube: std::sync::Arc<Mesh>, target: &wgpu::TextureView) {
//! let mut effect = HolographicEffect::new(gpu, EffectConfig::default());
//! effect.trigger(Vec3::ZERO);
//!
//! let camera = Camera::new().at(Vec3::new(0.0, 2.0, 6.0)).looking_at(Vec3::ZERO);
//! let crate_at = Transform::from_position(Vec3::new(1.0, 0.5, 0.0));
//! let mut encoder = gpu.device.create_command_encoder(&Default::default());
//!
//! effect.update(1.0 / 60.0);
//! scene.render(gpu, &mut encoder, &camera, 0.0, &[SceneDraw {
//!     mesh: &cube,
//!     transform: crate_at,
//!     color: [0.8, 0.8, 0.8, 1.0],
//! }]);
//! effect.begin_frame(gpu, &mut encoder, &camera);
//! effect.query_overlay_candidate(Some(crate_at.position), &[Renderable::new(cube, crate_at)]);
//! effect.composite(gpu, &mut encoder, scene.inputs(), target);
//!
//! gpu.queue.submit(Some(encoder.finish()));
//! # }
//! ```
//!
//! ## Configuration
//!
//! Every tunable lives in [`EffectConfig`], which deserialises from TOML with
//! defaults for missing keys. See [`EffectConfig::load`].

mod blit;
mod camera;
mod compositor;
mod config;
mod draw_buffer;
mod effect;
mod error;
mod fade;
mod gpu;
mod mask_pass;
mod mesh;
mod overlay_pass;
mod render_target;
mod scene_pass;
mod texture;
mod timer;
mod visibility;
mod world_pass;

pub use blit::Blit;
pub use camera::Camera;
pub use compositor::{CompositeOutcome, CompositePlan, Compositor, SceneInputs};
pub use config::{EffectConfig, Reconstruction, VisibilityTest};
pub use effect::HolographicEffect;
pub use error::{ConfigError, HoloError};
pub use fade::{FadeFactors, fade_factor};
pub use gpu::GpuContext;
pub use mask_pass::{MASK_FORMAT, MaskPass, Renderable};
pub use mesh::{Mesh, Transform, Vertex3d};
pub use overlay_pass::{OverlayPass, OverlayUniforms};
pub use render_target::{DEPTH_FORMAT, Lease, RenderTarget, TargetPool};
pub use scene_pass::{SceneDraw, ScenePass};
pub use texture::Texture;
pub use timer::{EffectState, EffectTimer, Phase};
pub use visibility::VisibilityGate;
pub use world_pass::{WorldRenderPass, WorldUniforms};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
