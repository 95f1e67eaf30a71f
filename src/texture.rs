use std::path::Path;

use crate::gpu::GpuContext;

/// Size of the procedural overlay tile used when no image is available.
const SCANLINE_TILE: u32 = 64;

/// A GPU texture that can be bound to shaders.
///
/// Samplers repeat in both directions so the holographic overlay can be tiled
/// across the screen.
#[derive(Debug)]
pub struct Texture {
    /// Keeps the texture alive for as long as `view` is bound.
    _texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
}

impl Texture {
    /// Create a texture from raw RGBA data.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            _texture: texture,
            view,
            sampler,
        }
    }

    /// The hologram overlay: the image at `path` if it loads, otherwise the
    /// procedural scanline tile.
    ///
    /// A missing or undecodable image is logged and never fails the effect.
    pub fn overlay(gpu: &GpuContext, path: Option<&Path>) -> Self {
        let image = OverlayImage::load(path);
        Self::from_rgba(gpu, &image.pixels, image.width, image.height, image.label)
    }
}

/// CPU-side pixels for [`Texture::overlay`].
struct OverlayImage {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    label: &'static str,
}

impl OverlayImage {
    fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::scanlines(SCANLINE_TILE);
        };

        match image::open(path) {
            Ok(img) => {
                let img = img.to_rgba8();
                let (width, height) = img.dimensions();
                tracing::info!(path = %path.display(), width, height, "loaded overlay texture");
                Self {
                    pixels: img.into_raw(),
                    width,
                    height,
                    label: "Hologram Overlay",
                }
            }
            Err(error) => {
                tracing::warn!(
                    %error,
                    path = %path.display(),
                    "overlay texture unavailable, using scanlines"
                );
                Self::scanlines(SCANLINE_TILE)
            }
        }
    }

    /// Procedural hologram tile: horizontal scanlines over a faint cell grid.
    fn scanlines(size: u32) -> Self {
        let size = size.max(4);
        Self {
            pixels: scanline_pixels(size),
            width: size,
            height: size,
            label: "Hologram Scanlines",
        }
    }
}

fn scanline_pixels(size: u32) -> Vec<u8> {
    let mut data = vec![0u8; (size * size * 4) as usize];
    let line_period = (size / 4).max(2);

    for y in 0..size {
        for x in 0..size {
            let idx = ((y * size + x) * 4) as usize;

            let on_line = y % line_period < line_period / 2;
            let on_grid = x == 0 || y == 0;

            let value: u8 = match (on_grid, on_line) {
                (true, _) => 255,
                (false, true) => 200,
                (false, false) => 60,
            };

            data[idx] = value;
            data[idx + 1] = value;
            data[idx + 2] = value;
            data[idx + 3] = 255;
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanline_tile_is_opaque_and_banded() {
        let size = 16;
        let data = scanline_pixels(size);
        assert_eq!(data.len(), (size * size * 4) as usize);
        assert!(data.chunks(4).all(|px| px[3] == 255));

        // Column 1 avoids the grid line; rows alternate between bright and dim bands.
        let at = |x: u32, y: u32| data[((y * size + x) * 4) as usize];
        assert_eq!(at(1, 1), 200);
        assert_eq!(at(1, 3), 60);
        assert_eq!(at(1, 5), 200);
        assert_eq!(at(0, 3), 255);
    }

    #[test]
    fn no_path_uses_scanlines() {
        let image = OverlayImage::load(None);
        assert_eq!((image.width, image.height), (SCANLINE_TILE, SCANLINE_TILE));
        assert_eq!(image.pixels, scanline_pixels(SCANLINE_TILE));
    }

    #[test]
    fn missing_image_falls_back_to_scanlines() {
        let dir = tempfile::tempdir().unwrap();
        let image = OverlayImage::load(Some(&dir.path().join("missing.png")));
        assert_eq!(image.label, "Hologram Scanlines");
        assert_eq!(image.pixels.len(), (SCANLINE_TILE * SCANLINE_TILE * 4) as usize);
    }

    #[test]
    fn undecodable_image_falls_back_to_scanlines() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        std::fs::write(file.path(), b"not a png").unwrap();
        let image = OverlayImage::load(Some(file.path()));
        assert_eq!(image.label, "Hologram Scanlines");
    }

    #[test]
    fn readable_image_is_used() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .save(file.path())
            .unwrap();

        let image = OverlayImage::load(Some(file.path()));
        assert_eq!((image.width, image.height), (3, 2));
        assert_eq!(&image.pixels[..4], &[10, 20, 30, 255]);
    }
}
