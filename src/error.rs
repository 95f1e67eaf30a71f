//! Error types shared by the effect, its passes and the configuration loader.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while reading or validating an [`EffectConfig`](crate::EffectConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors produced while setting up the GPU or the holographic passes.
///
/// None of these are fatal to the host: a [`HolographicEffect`](crate::HolographicEffect)
/// that fails to initialise logs the error and disables itself.
#[derive(Debug, Error)]
pub enum HoloError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{label} was rejected by the GPU: {message}")]
    Validation { label: &'static str, message: String },

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to acquire surface texture: {0}")]
    Frame(#[from] wgpu::SurfaceError),
}
