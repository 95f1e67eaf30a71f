//! Offscreen render targets and the per-frame temporary pool.

use std::mem::ManuallyDrop;

use crate::gpu::GpuContext;

/// Depth format shared by every depth attachment in the crate.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// An offscreen texture that can be rendered to and sampled from.
///
/// Targets track the viewport: call [`ensure_size`](Self::ensure_size) once per
/// frame and a resized window reallocates the texture.
pub struct RenderTarget {
    /// The underlying GPU texture that stores pixel data.
    pub texture: wgpu::Texture,
    /// A view into the texture, used for render pass attachments and shader sampling.
    pub view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    label: &'static str,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Creates a target matching the current surface dimensions.
    pub fn new(gpu: &GpuContext, format: wgpu::TextureFormat, label: &'static str) -> Self {
        Self::with_size(gpu, format, label, gpu.width(), gpu.height())
    }

    /// Creates a depth target matching the current surface dimensions.
    pub fn depth(gpu: &GpuContext, label: &'static str) -> Self {
        Self::new(gpu, DEPTH_FORMAT, label)
    }

    fn with_size(
        gpu: &GpuContext,
        format: wgpu::TextureFormat,
        label: &'static str,
        width: u32,
        height: u32,
    ) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            format,
            label,
            width,
            height,
        }
    }

    /// Reallocates the texture if the surface size changed.
    ///
    /// Returns `true` when a new texture was created.
    pub fn ensure_size(&mut self, gpu: &GpuContext) -> bool {
        if self.width == gpu.width() && self.height == gpu.height() {
            return false;
        }
        tracing::info!(
            label = self.label,
            width = gpu.width(),
            height = gpu.height(),
            "reallocating render target"
        );
        *self = Self::with_size(gpu, self.format, self.label, gpu.width(), gpu.height());
        true
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// A small free list of reusable resources keyed by size.
///
/// [`acquire`](Self::acquire) hands out a [`Lease`]; dropping the lease puts the
/// resource back, so a temporary is returned on every exit path of the frame.
/// Entries whose size no longer matches the request are discarded.
pub struct TargetPool<T> {
    free: Vec<((u32, u32), T)>,
    outstanding: usize,
}

impl<T> Default for TargetPool<T> {
    fn default() -> Self {
        Self {
            free: Vec::new(),
            outstanding: 0,
        }
    }
}

impl<T> TargetPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows a resource of `size`, creating one with `create` if none is free.
    pub fn acquire(&mut self, size: (u32, u32), create: impl FnOnce() -> T) -> Lease<'_, T> {
        self.free.retain(|(free_size, _)| *free_size == size);
        let item = match self.free.pop() {
            Some((_, item)) => item,
            None => create(),
        };
        self.outstanding += 1;
        Lease {
            pool: self,
            size,
            item: ManuallyDrop::new(item),
        }
    }

    /// Resources currently lent out.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Resources waiting to be reused.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Drops every free resource.
    pub fn clear(&mut self) {
        self.free.clear();
    }
}

/// A resource borrowed from a [`TargetPool`], returned on drop.
pub struct Lease<'a, T> {
    pool: &'a mut TargetPool<T>,
    size: (u32, u32),
    item: ManuallyDrop<T>,
}

impl<T> std::ops::Deref for Lease<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T> Drop for Lease<'_, T> {
    fn drop(&mut self) {
        // SAFETY: `item` is taken exactly once, here, and never touched again.
        let item = unsafe { ManuallyDrop::take(&mut self.item) };
        self.pool.free.push((self.size, item));
        self.pool.outstanding -= 1;
    }
}
