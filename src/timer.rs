//! Trigger and countdown state for one effect instance.
//!
//! An effect runs two phases off a single trigger: the *scan* (the expanding
//! wavefront) and the *display* (the silhouette overlay that outlives it).
//! Each phase counts up from zero and switches itself off once its elapsed
//! time passes the configured maximum.
//!
//! ```
//! use holoscan::{EffectConfig, EffectTimer, Phase, Vec3};
//!
//! let config = EffectConfig::default();
//! let mut timer = EffectTimer::new(&config);
//!
//! assert!(timer.trigger(Vec3::new(0.0, 0.0, -5.0)));
//! assert!(!timer.trigger(Vec3::ZERO)); // already scanning
//! assert_eq!(timer.phase(), Phase::ScanningAndDisplaying);
//!
//! timer.advance(config.max_scan_time + 0.1);
//! assert_eq!(timer.phase(), Phase::Displaying);
//! ```

use glam::Vec3;

use crate::config::EffectConfig;

/// Live state of one effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectState {
    /// World-space origin of the current scan.
    pub trigger_position: Vec3,
    /// Seconds since the scan was triggered.
    pub scan_elapsed: f32,
    pub is_scanning: bool,
    /// Seconds since the overlay started displaying.
    pub display_elapsed: f32,
    pub is_displaying: bool,
}

impl Default for EffectState {
    fn default() -> Self {
        Self {
            trigger_position: Vec3::ZERO,
            scan_elapsed: 0.0,
            is_scanning: false,
            display_elapsed: 0.0,
            is_displaying: false,
        }
    }
}

impl EffectState {
    /// True while either phase is running.
    pub fn is_active(&self) -> bool {
        self.is_scanning || self.is_displaying
    }
}

/// Which phases are currently running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    Displaying,
    ScanningAndDisplaying,
}

/// Drives an [`EffectState`] from triggers and frame deltas.
#[derive(Clone, Debug)]
pub struct EffectTimer {
    state: EffectState,
    max_scan_time: f32,
    max_display_time: f32,
}

impl EffectTimer {
    pub fn new(config: &EffectConfig) -> Self {
        Self {
            state: EffectState::default(),
            max_scan_time: config.max_scan_time,
            max_display_time: config.max_display_time,
        }
    }

    /// Starts a scan at `position`.
    ///
    /// Returns `false` and leaves the state untouched if a scan is already in
    /// progress. A display phase left over from an earlier scan does not block
    /// a new trigger; it is restarted.
    pub fn trigger(&mut self, position: Vec3) -> bool {
        if self.state.is_scanning {
            tracing::debug!(?position, "scan rejected, one is already running");
            return false;
        }

        self.state = EffectState {
            trigger_position: position,
            scan_elapsed: 0.0,
            is_scanning: true,
            display_elapsed: 0.0,
            is_displaying: true,
        };
        tracing::debug!(?position, "scan triggered");
        true
    }

    /// Advances both running phases by `dt` seconds.
    ///
    /// Negative or non-finite deltas are ignored.
    pub fn advance(&mut self, dt: f32) {
        if !dt.is_finite() || dt < 0.0 {
            return;
        }

        if self.state.is_displaying {
            self.state.display_elapsed += dt;
            if self.state.display_elapsed > self.max_display_time {
                self.state.is_displaying = false;
                tracing::debug!("display phase finished");
            }
        }

        if self.state.is_scanning {
            self.state.scan_elapsed += dt;
            if self.state.scan_elapsed > self.max_scan_time {
                self.state.is_scanning = false;
                tracing::debug!("scan phase finished");
            }
        }
    }

    pub fn state(&self) -> &EffectState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        match (self.state.is_scanning, self.state.is_displaying) {
            (false, false) => Phase::Idle,
            (true, false) => Phase::Scanning,
            (false, true) => Phase::Displaying,
            (true, true) => Phase::ScanningAndDisplaying,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}
