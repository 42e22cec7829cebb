use wgpu::Buffer;

use crate::error::EngineError;
use crate::wgpu_context::WgpuContext;

/// A fixed-capacity device buffer plus the host copy of its last download.
#[derive(Debug)]
pub struct GpuBuffer<T> {
    data: Vec<T>,
    buffer: wgpu::Buffer,
    capacity: u32,
}

impl<T: bytemuck::Pod> GpuBuffer<T> {
    /// Allocates room for `capacity` elements and uploads `initial_data` to its front.
    ///
    /// The allocation is checked against the device limits and runs inside
    /// an out-of-memory error scope, so exhaustion surfaces as
    /// [`EngineError::Allocation`] instead of a device loss.
    pub fn with_capacity(
        wgpu_context: &WgpuContext,
        label: &str,
        capacity: u32,
        initial_data: &[T],
        usage: wgpu::BufferUsages,
    ) -> Result<Self, EngineError> {
        assert!(initial_data.len() <= capacity as usize, "initial data exceeds buffer capacity");
        let device = wgpu_context.get_device();
        let usage = usage | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC;

        // wgpu rejects zero-sized bindings, keep at least one element
        let size = capacity.max(1) as u64 * size_of::<T>().max(1) as u64;
        let allocation_error = || EngineError::Allocation { label: label.to_string(), requested_bytes: size };

        let limits = device.limits();
        if size > limits.max_buffer_size {
            return Err(allocation_error());
        }
        if usage.contains(wgpu::BufferUsages::STORAGE) && size > limits.max_storage_buffer_binding_size as u64 {
            return Err(allocation_error());
        }

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            log::error!("Allocation of {label} ({size} bytes) failed: {error}");
            return Err(allocation_error());
        }

        if !initial_data.is_empty() {
            wgpu_context.get_queue().write_buffer(&buffer, 0, bytemuck::cast_slice(initial_data));
        }

        Ok(Self {
            data: initial_data.to_vec(),
            buffer,
            capacity,
        })
    }

    pub fn len(&self) -> u32 {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.capacity == 0
    }

    fn size_bytes(&self) -> u64 {
        self.capacity as u64 * size_of::<T>() as u64
    }

    /// Downloads the whole buffer into the host copy and returns it.
    ///
    /// Blocks until every previously submitted command has finished.
    pub fn download(&mut self, wgpu_context: &WgpuContext) -> Result<&Vec<T>, EngineError> {
        let device = wgpu_context.get_device();
        let queue = wgpu_context.get_queue();

        let size = self.size_bytes();
        if size == 0 {
            self.data.clear();
            return Ok(&self.data);
        }

        // A staging buffer the CPU can map
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer (Download)"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Download Encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging_buffer, 0, size);
        queue.submit(Some(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver outlives the poll below
            let _ = sender.send(result);
        });

        // Blocks until the copy and the mapping are done
        device.poll(wgpu::wgt::PollType::Wait)?;

        receiver
            .recv()
            .map_err(|_| EngineError::Device("buffer mapping callback never ran".into()))??;

        {
            let mapped_range = buffer_slice.get_mapped_range();
            let downloaded_data: &[T] = bytemuck::cast_slice(&mapped_range);
            self.data.clear();
            self.data.extend_from_slice(downloaded_data);
        }
        staging_buffer.unmap();

        Ok(&self.data)
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}
