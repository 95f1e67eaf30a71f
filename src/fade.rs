//! Clamped linear fade ramps.
//!
//! Both phases of the effect fade out the same way: full strength until a
//! fade-start time, then a straight line down to zero at the phase maximum.

use crate::config::EffectConfig;
use crate::timer::EffectState;

/// `1 - clamp01((elapsed - fade_start) / (max - fade_start))`.
///
/// Returns 1.0 before the fade window opens and 0.0 from `max` onwards. When
/// the window is empty (`max <= fade_start`) the ramp degenerates to a hard
/// cutoff at `max`.
pub fn fade_factor(elapsed: f32, fade_start: f32, max: f32) -> f32 {
    let window = max - fade_start;
    if window.is_nan() || window <= f32::EPSILON {
        return if elapsed < max { 1.0 } else { 0.0 };
    }
    1.0 - ((elapsed - fade_start) / window).clamp(0.0, 1.0)
}

/// Fade factors for the two phases of one effect.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FadeFactors {
    /// Strength of the scan wavefront.
    pub scan: f32,
    /// Strength of the silhouette overlay.
    pub display: f32,
}

impl FadeFactors {
    /// Evaluates both ramps. A phase that is no longer running reports zero.
    pub fn evaluate(state: &EffectState, config: &EffectConfig) -> Self {
        let scan = if state.is_scanning {
            fade_factor(state.scan_elapsed, config.fade_scan_time, config.max_scan_time)
        } else {
            0.0
        };
        let display = if state.is_displaying {
            fade_factor(
                state.display_elapsed,
                config.fade_out_time,
                config.max_display_time,
            )
        } else {
            0.0
        };
        Self { scan, display }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::EffectTimer;
    use glam::Vec3;

    #[test]
    fn full_strength_before_window() {
        for e in [-1.0, 0.0, 0.5, 1.0] {
            assert_eq!(fade_factor(e, 1.0, 2.0), 1.0);
        }
    }

    #[test]
    fn zero_at_and_after_max() {
        for e in [2.0, 2.1, 10.0] {
            assert_eq!(fade_factor(e, 1.0, 2.0), 0.0);
        }
    }

    #[test]
    fn linear_inside_window() {
        assert!((fade_factor(1.5, 1.0, 2.0) - 0.5).abs() < 1e-6);
        assert!((fade_factor(3.5, 3.0, 4.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn non_increasing_over_window() {
        let mut last = f32::INFINITY;
        for i in 0..=100 {
            let e = 1.0 + i as f32 * 0.01;
            let f = fade_factor(e, 1.0, 2.0);
            assert!(f <= last);
            last = f;
        }
    }

    #[test]
    fn degenerate_window_is_a_cutoff() {
        assert_eq!(fade_factor(0.5, 1.0, 1.0), 1.0);
        assert_eq!(fade_factor(1.0, 1.0, 1.0), 0.0);
        assert_eq!(fade_factor(1.5, 2.0, 1.0), 0.0);
        assert!(!fade_factor(1.0, 1.0, 1.0).is_nan());
    }

    #[test]
    fn scan_fade_scenario() {
        let config = EffectConfig {
            max_scan_time: 2.0,
            fade_scan_time: 1.0,
            ..EffectConfig::default()
        };
        let mut timer = EffectTimer::new(&config);
        assert!(timer.trigger(Vec3::ZERO));

        timer.advance(1.5);
        let fades = FadeFactors::evaluate(timer.state(), &config);
        assert!((fades.scan - 0.5).abs() < 1e-6);

        timer.advance(0.6);
        assert!(!timer.state().is_scanning);
        assert_eq!(FadeFactors::evaluate(timer.state(), &config).scan, 0.0);
    }

    #[test]
    fn idle_state_has_no_fade() {
        let config = EffectConfig::default();
        let timer = EffectTimer::new(&config);
        assert_eq!(
            FadeFactors::evaluate(timer.state(), &config),
            FadeFactors::default()
        );
    }
}
