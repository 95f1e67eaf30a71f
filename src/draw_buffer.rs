//! Per-draw uniforms packed into one buffer and addressed by dynamic offset.
//!
//! Writing a single uniform buffer once per draw with `queue.write_buffer`
//! leaves every draw in the pass reading the last write, since the writes all
//! land before the pass executes. Each draw instead gets its own aligned slot.

use std::marker::PhantomData;

use crate::gpu::GpuContext;

/// Rounds `size` up to a multiple of `alignment`.
pub(crate) fn aligned_stride(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

/// A growable array of `T` uniform slots bound at `@group(n) @binding(0)` with a
/// dynamic offset.
pub(crate) struct DrawUniforms<T> {
    label: &'static str,
    layout: wgpu::BindGroupLayout,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> DrawUniforms<T> {
    pub(crate) fn new(gpu: &GpuContext, label: &'static str) -> Self {
        let device = &gpu.device;
        let stride = aligned_stride(
            std::mem::size_of::<T>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
                },
                count: None,
            }],
        });

        let capacity = 16;
        let (buffer, bind_group) = Self::allocate(device, label, &layout, stride, capacity);

        Self {
            label,
            layout,
            buffer,
            bind_group,
            stride,
            capacity,
            _marker: PhantomData,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        label: &'static str,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
                }),
            }],
        });

        (buffer, bind_group)
    }

    pub(crate) fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub(crate) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Uploads `items`, growing the buffer if needed, and returns the dynamic
    /// offset of each slot.
    pub(crate) fn upload(&mut self, gpu: &GpuContext, items: &[T]) -> Vec<u32> {
        if items.len() > self.capacity {
            self.capacity = items.len().next_power_of_two();
            let (buffer, bind_group) = Self::allocate(
                &gpu.device,
                self.label,
                &self.layout,
                self.stride,
                self.capacity,
            );
            self.buffer = buffer;
            self.bind_group = bind_group;
        }

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let offset = i as u64 * self.stride;
                gpu.queue
                    .write_buffer(&self.buffer, offset, bytemuck::bytes_of(item));
                offset as u32
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_rounds_up_to_alignment() {
        assert_eq!(aligned_stride(80, 256), 256);
        assert_eq!(aligned_stride(256, 256), 256);
        assert_eq!(aligned_stride(257, 256), 512);
        assert_eq!(aligned_stride(144, 64), 192);
    }

    #[test]
    fn zero_alignment_is_treated_as_one() {
        assert_eq!(aligned_stride(80, 0), 80);
    }
}
