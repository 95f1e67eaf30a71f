//! The holographic scan effect as a service object.
//!
//! [`HolographicEffect`] bundles the timer, the visibility gate and the
//! compositor behind the two operations collaborators need, [`trigger`] and
//! [`query_overlay_candidate`], plus the frame-driver calls the host makes.
//! Collaborators receive the effect by reference; there is no global instance.
//!
//! # Frame order
//!
//! ```ignore
//! effect.update(dt);
//! effect.begin_frame(&gpu, &mut encoder, &camera);
//! for (position, renderables) in objects {
//!     effect.query_overlay_candidate(Some(position), renderables);
//! }
//! effect.composite(&gpu, &mut encoder, scene, &surface_view);
//! ```
//!
//! # Disabled effects
//!
//! If the effect cannot be built (invalid config, shaders rejected by the GPU)
//! it logs a warning and stays disabled for its whole lifetime: `trigger`
//! returns `false`, queries are ignored and `composite` reports
//! [`CompositeOutcome::Disabled`]. A missing overlay image is not fatal; the
//! procedural scanline tile takes its place.
//!
//! # Out-of-order calls
//!
//! Queries made before `begin_frame` are dropped, and a `composite` without a
//! `begin_frame` copies the scene through untouched: without the frame's
//! camera there is nothing to reconstruct world positions from.
//!
//! [`trigger`]: HolographicEffect::trigger
//! [`query_overlay_candidate`]: HolographicEffect::query_overlay_candidate

use glam::Vec3;

use crate::camera::Camera;
use crate::compositor::{CompositeOutcome, CompositePlan, Compositor, SceneInputs};
use crate::config::EffectConfig;
use crate::error::HoloError;
use crate::fade::FadeFactors;
use crate::gpu::GpuContext;
use crate::mask_pass::Renderable;
use crate::timer::{EffectState, EffectTimer, Phase};
use crate::visibility::VisibilityGate;

pub struct HolographicEffect {
    config: EffectConfig,
    timer: EffectTimer,
    gate: VisibilityGate,
    compositor: Option<Compositor>,
    /// Camera and aspect of the frame in progress.
    view: Option<(Camera, f32)>,
}

impl HolographicEffect {
    /// Builds the effect, falling back to a disabled effect on failure.
    pub fn new(gpu: &GpuContext, config: EffectConfig) -> Self {
        match Self::try_new(gpu, config.clone()) {
            Ok(effect) => effect,
            Err(error) => {
                tracing::warn!(%error, "holographic effect disabled");
                Self::disabled(config)
            }
        }
    }

    /// Builds the effect, reporting why it could not be.
    pub fn try_new(gpu: &GpuContext, config: EffectConfig) -> Result<Self, HoloError> {
        config.validate()?;
        let compositor = Compositor::new(gpu, &config, gpu.config.format)?;
        let mut effect = Self::disabled(config);
        effect.compositor = Some(compositor);
        Ok(effect)
    }

    /// An effect that ignores every call.
    pub fn disabled(config: EffectConfig) -> Self {
        Self {
            timer: EffectTimer::new(&config),
            gate: VisibilityGate::new(config.visibility),
            config,
            compositor: None,
            view: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.compositor.is_some()
    }

    /// Starts a scan at `position`. Returns `false` if one is already running
    /// or the effect is disabled.
    pub fn trigger(&mut self, position: Vec3) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.timer.trigger(position)
    }

    /// Advances the effect clock by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if self.is_enabled() {
            self.timer.advance(dt);
        }
    }

    /// Starts a frame seen through `camera`.
    pub fn begin_frame(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        camera: &Camera,
    ) {
        let Some(compositor) = self.compositor.as_mut() else {
            return;
        };
        compositor.begin_frame(gpu, encoder);
        self.view = Some((*camera, gpu.aspect()));
    }

    /// Offers an object's renderables for this frame's overlay.
    ///
    /// `position` is the object's reference point for the frustum test. Does
    /// nothing outside a frame or when the gate rejects the object.
    pub fn query_overlay_candidate(&mut self, position: Option<Vec3>, objects: &[Renderable]) {
        if !self.accepts(position) {
            return;
        }
        let Some(compositor) = self.compositor.as_mut() else {
            return;
        };
        for object in objects {
            compositor.submit_mask_draw(object.clone());
        }
    }

    /// Whether an object at `position` joins this frame's overlay.
    pub fn accepts(&self, position: Option<Vec3>) -> bool {
        let Some((camera, aspect)) = &self.view else {
            return false;
        };
        let displaying = self.timer.state().is_displaying;
        self.gate
            .should_overlay(position, displaying, camera, *aspect)
    }

    /// What [`composite`](Self::composite) will do with the current state.
    ///
    /// Always a pass-through while no frame is open.
    pub fn plan(&self) -> CompositePlan {
        if self.view.is_none() {
            return CompositePlan::PassThrough;
        }
        CompositePlan::for_state(self.timer.state(), &self.config)
    }

    /// Writes this frame's final image into `target` and ends the frame.
    pub fn composite(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        scene: SceneInputs,
        target: &wgpu::TextureView,
    ) -> CompositeOutcome {
        let plan = self.plan();
        let view = self.view.take();
        let Some(compositor) = self.compositor.as_mut() else {
            return CompositeOutcome::Disabled;
        };

        match (plan, view) {
            (CompositePlan::Holographic(_), Some((camera, _))) => compositor.composite(
                gpu,
                encoder,
                &camera,
                self.timer.state(),
                &self.config,
                scene,
                target,
            ),
            (_, view) => {
                if view.is_none() && self.timer.is_active() {
                    tracing::debug!("composite without begin_frame, passing the scene through");
                }
                compositor.pass_through(gpu, encoder, scene, target)
            }
        }
    }

    /// Drops every GPU resource and disables the effect. Safe to call twice.
    pub fn release(&mut self) {
        if self.compositor.take().is_some() {
            tracing::info!("holographic effect released");
        }
        self.view = None;
    }

    pub fn state(&self) -> &EffectState {
        self.timer.state()
    }

    pub fn phase(&self) -> Phase {
        self.timer.phase()
    }

    pub fn fades(&self) -> FadeFactors {
        FadeFactors::evaluate(self.timer.state(), &self.config)
    }

    pub fn config(&self) -> &EffectConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_effect_ignores_triggers() {
        let mut effect = HolographicEffect::disabled(EffectConfig::default());
        assert!(!effect.is_enabled());
        assert!(!effect.trigger(Vec3::ZERO));
        assert_eq!(effect.phase(), Phase::Idle);
    }

    #[test]
    fn disabled_effect_does_not_advance() {
        let mut effect = HolographicEffect::disabled(EffectConfig::default());
        effect.update(1.0);
        assert_eq!(*effect.state(), EffectState::default());
        assert_eq!(effect.fades(), FadeFactors::default());
    }

    #[test]
    fn queries_without_a_frame_are_ignored() {
        let mut effect = HolographicEffect::disabled(EffectConfig::default());
        effect.query_overlay_candidate(Some(Vec3::ZERO), &[]);
        effect.query_overlay_candidate(None, &[]);
    }

    #[test]
    fn release_is_idempotent() {
        let mut effect = HolographicEffect::disabled(EffectConfig::default());
        effect.release();
        effect.release();
        assert!(!effect.is_enabled());
    }

    /// A running effect with an open frame, built without a GPU.
    fn displaying(visibility: crate::config::VisibilityTest, camera: Camera) -> HolographicEffect {
        let config = EffectConfig {
            visibility,
            ..EffectConfig::default()
        };
        let mut effect = HolographicEffect::disabled(config);
        assert!(effect.timer.trigger(Vec3::ZERO));
        effect.view = Some((camera, 1.0));
        effect
    }

    #[test]
    fn frustum_gate_drops_objects_off_screen() {
        let effect = displaying(crate::config::VisibilityTest::Frustum, Camera::default());
        assert!(effect.accepts(Some(Vec3::ZERO)));
        assert!(!effect.accepts(Some(Vec3::new(7.5, 0.0, 0.0))));
        assert!(!effect.accepts(Some(Vec3::new(0.0, 0.0, 10.0))));
        assert!(effect.accepts(None));
    }

    #[test]
    fn always_gate_accepts_everything_while_displaying() {
        let effect = displaying(crate::config::VisibilityTest::Always, Camera::default());
        assert!(effect.accepts(Some(Vec3::new(7.5, 0.0, 0.0))));
    }

    #[test]
    fn nothing_is_accepted_outside_a_frame() {
        let mut effect = displaying(crate::config::VisibilityTest::Always, Camera::default());
        effect.view = None;
        assert!(!effect.accepts(Some(Vec3::ZERO)));
        assert!(!effect.accepts(None));
    }

    #[test]
    fn nothing_is_accepted_once_display_ends() {
        let mut effect = displaying(crate::config::VisibilityTest::Always, Camera::default());
        effect.timer.advance(effect.config.max_display_time + 0.1);
        assert!(!effect.accepts(Some(Vec3::ZERO)));
    }

    #[test]
    fn composite_without_a_frame_passes_through() {
        let mut effect = displaying(crate::config::VisibilityTest::Frustum, Camera::default());
        assert!(matches!(effect.plan(), CompositePlan::Holographic(_)));

        effect.view = None;
        assert!(effect.timer.is_active());
        assert_eq!(effect.plan(), CompositePlan::PassThrough);
    }

    #[test]
    fn gate_uses_configured_test() {
        let config = EffectConfig {
            visibility: crate::config::VisibilityTest::Always,
            ..EffectConfig::default()
        };
        let effect = HolographicEffect::disabled(config);
        assert_eq!(effect.gate.test(), crate::config::VisibilityTest::Always);
    }
}
