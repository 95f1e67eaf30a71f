//! Tunables for a [`HolographicEffect`](crate::HolographicEffect).
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```toml
//! max_scan_time = 3.0
//! radius = 6.0
//! overlay_texture = "assets/hologram.png"
//! reconstruction = "camera_depth"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// How the world-render pass recovers a world position from scene depth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reconstruction {
    /// Interpolate the four far-plane corner rays by screen UV and scale by
    /// linear depth.
    #[default]
    FrustumCorners,
    /// Unproject NDC depth with the inverse projection, then apply the
    /// camera-to-world matrix.
    CameraDepth,
}

/// Which objects the overlay pass accepts while the effect is displaying.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityTest {
    /// Every submitted object.
    Always,
    /// Only objects whose reference point projects inside the view frustum.
    #[default]
    Frustum,
}

/// Effect tunables. Read-only once the effect is constructed.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    /// Seconds the scan wavefront runs for.
    pub max_scan_time: f32,
    /// Seconds into the scan at which the wavefront starts fading.
    pub fade_scan_time: f32,
    /// Seconds the silhouette overlay stays up.
    pub max_display_time: f32,
    /// Seconds into the display phase at which the overlay starts fading.
    pub fade_out_time: f32,
    /// Wavefront speed in world units per second.
    pub radius: f32,
    /// Base brightness of the region the wavefront has already swept.
    pub fade: f32,
    /// Thickness of the wavefront edge in world units.
    pub fade_width: f32,
    /// Optional image tiled across the overlay. A procedural scanline
    /// pattern is used when unset.
    pub overlay_texture: Option<PathBuf>,
    /// Tiling denominator: the overlay repeats `viewport / effect_scale`
    /// times across the screen.
    pub effect_scale: f32,
    pub reconstruction: Reconstruction,
    pub visibility: VisibilityTest,
    /// Flat colour written into the scan mask by the replacement material.
    pub mask_color: [f32; 4],
    /// Tint for the wavefront and the holographic overlay.
    pub overlay_color: [f32; 4],
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            max_scan_time: 2.0,
            fade_scan_time: 1.0,
            max_display_time: 4.0,
            fade_out_time: 3.0,
            radius: 10.0,
            fade: 1.0,
            fade_width: 0.5,
            overlay_texture: None,
            effect_scale: 10.0,
            reconstruction: Reconstruction::default(),
            visibility: VisibilityTest::default(),
            mask_color: [1.0, 1.0, 1.0, 1.0],
            overlay_color: [0.2, 0.8, 1.0, 1.0],
        }
    }
}

impl EffectConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!(path = %path.display(), "loaded effect config");
        Ok(config)
    }

    /// Rejects values the passes cannot work with.
    ///
    /// A fade start at or past its maximum is accepted (the fade becomes a
    /// hard cutoff) but logged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let times = [
            ("max_scan_time", self.max_scan_time),
            ("fade_scan_time", self.fade_scan_time),
            ("max_display_time", self.max_display_time),
            ("fade_out_time", self.fade_out_time),
        ];
        for (field, value) in times {
            non_negative(field, value)?;
        }
        non_negative("radius", self.radius)?;
        non_negative("fade", self.fade)?;
        non_negative("fade_width", self.fade_width)?;

        if !(self.effect_scale.is_finite() && self.effect_scale > 0.0) {
            return Err(ConfigError::Invalid {
                field: "effect_scale",
                reason: format!("must be positive, got {}", self.effect_scale),
            });
        }

        if self.fade_scan_time >= self.max_scan_time {
            tracing::warn!(
                fade_scan_time = self.fade_scan_time,
                max_scan_time = self.max_scan_time,
                "scan fade starts at or after its end, the wavefront will cut off"
            );
        }
        if self.fade_out_time >= self.max_display_time {
            tracing::warn!(
                fade_out_time = self.fade_out_time,
                max_display_time = self.max_display_time,
                "display fade starts at or after its end, the overlay will cut off"
            );
        }
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be a non-negative number, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        EffectConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config = EffectConfig::from_toml_str(
            r#"
            radius = 6.5
            reconstruction = "camera_depth"
            visibility = "always"
            "#,
        )
        .unwrap();

        assert_eq!(config.radius, 6.5);
        assert_eq!(config.reconstruction, Reconstruction::CameraDepth);
        assert_eq!(config.visibility, VisibilityTest::Always);
        assert_eq!(config.max_scan_time, EffectConfig::default().max_scan_time);
        assert!(config.overlay_texture.is_none());
    }

    #[test]
    fn rejects_negative_time() {
        let err = EffectConfig::from_toml_str("max_display_time = -1.0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "max_display_time",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_effect_scale() {
        let err = EffectConfig::from_toml_str("effect_scale = 0.0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "effect_scale",
                ..
            }
        ));
    }

    #[test]
    fn degenerate_fade_window_is_allowed() {
        let config = EffectConfig::from_toml_str(
            r#"
            max_scan_time = 1.0
            fade_scan_time = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(config.fade_scan_time, config.max_scan_time);
    }

    #[test]
    fn unknown_enum_value_is_a_parse_error() {
        let err = EffectConfig::from_toml_str(r#"reconstruction = "raytraced""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "overlay_texture = \"holo.png\"").unwrap();
        writeln!(file, "mask_color = [1.0, 0.0, 0.0, 1.0]").unwrap();

        let config = EffectConfig::load(file.path()).unwrap();
        assert_eq!(config.overlay_texture, Some(PathBuf::from("holo.png")));
        assert_eq!(config.mask_color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = EffectConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
