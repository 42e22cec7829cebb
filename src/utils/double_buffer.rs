use crate::error::EngineError;
use crate::utils::gpu_buffer::GpuBuffer;
use crate::wgpu_context::WgpuContext;

/// Which of the two regions is currently readable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Ping,
    Pong,
}

impl Side {
    pub fn flipped(self) -> Self {
        match self {
            Side::Ping => Side::Pong,
            Side::Pong => Side::Ping,
        }
    }

    fn source_index(self) -> usize {
        match self {
            Side::Ping => 0,
            Side::Pong => 1,
        }
    }
}

/// Two storage regions of equal capacity plus a bit selecting which one is
/// read (source) and which one is written (target).
///
/// Swapping only toggles the bit; no data moves. Every dispatch writes the
/// target and is followed by a swap, so between rounds and between phases
/// `source()` holds the latest output. A third region receives a copy of
/// the source on [`promote`](DoubleBuffer::promote) and is what a renderer
/// gets to look at, so it is never a dispatch target.
#[derive(Debug)]
pub struct DoubleBuffer<R> {
    regions: [R; 2],
    presentation: R,
    side: Side,
    capacity: u32,
}

impl<R> DoubleBuffer<R> {
    pub(crate) fn from_regions(ping: R, pong: R, presentation: R, capacity: u32) -> Self {
        Self {
            regions: [ping, pong],
            presentation,
            side: Side::Ping,
            capacity,
        }
    }

    pub fn swap(&mut self) {
        self.side = self.side.flipped();
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn source(&self) -> &R {
        &self.regions[self.side.source_index()]
    }

    pub fn target(&self) -> &R {
        &self.regions[1 - self.side.source_index()]
    }

    pub fn target_mut(&mut self) -> &mut R {
        &mut self.regions[1 - self.side.source_index()]
    }

    /// Source and target at once, the only shape a kernel needs.
    pub fn split(&mut self) -> (&R, &mut R) {
        let [ping, pong] = &mut self.regions;
        match self.side {
            Side::Ping => (&*ping, pong),
            Side::Pong => (&*pong, ping),
        }
    }

    pub fn region(&self, side: Side) -> &R {
        &self.regions[side.source_index()]
    }

    pub fn presentation(&self) -> &R {
        &self.presentation
    }

    pub(crate) fn source_and_presentation(&mut self) -> (&R, &mut R) {
        let source = &self.regions[self.side.source_index()];
        (source, &mut self.presentation)
    }
}

impl<T: Clone + Default> DoubleBuffer<Vec<T>> {
    /// Allocates both regions on the host. `initial_data` (at most
    /// `capacity` elements) is copied into both regions; the remainder is
    /// filled with `T::default()`.
    pub fn create(capacity: u32, initial_data: Option<&[T]>) -> Result<Self, EngineError> {
        let initial_data = initial_data.unwrap_or(&[]);
        assert!(
            initial_data.len() <= capacity as usize,
            "initial data ({}) exceeds capacity ({capacity})",
            initial_data.len()
        );

        let ping = Self::allocate_region(capacity, initial_data)?;
        let pong = ping.clone();
        let presentation = ping.clone();
        log::debug!("Allocated host double buffer with {capacity} slots per region");
        Ok(Self::from_regions(ping, pong, presentation, capacity))
    }

    fn allocate_region(capacity: u32, initial_data: &[T]) -> Result<Vec<T>, EngineError> {
        let mut region = Vec::new();
        region.try_reserve_exact(capacity as usize).map_err(|_| EngineError::Allocation {
            label: "host double buffer region".into(),
            requested_bytes: capacity as u64 * size_of::<T>() as u64,
        })?;
        region.extend_from_slice(initial_data);
        region.resize(capacity as usize, T::default());
        Ok(region)
    }

    /// Copies the latest output (the source side) into the presentation region.
    pub fn promote(&mut self) {
        let (source, presentation) = self.source_and_presentation();
        presentation.clone_from_slice(source);
    }
}

impl<T: bytemuck::Pod> DoubleBuffer<GpuBuffer<T>> {
    /// Allocates both regions and the presentation buffer on the device.
    /// `initial_data` is uploaded into both regions; the remaining slots are zeroed.
    pub fn create_on_device(
        wgpu_context: &WgpuContext,
        label: &str,
        capacity: u32,
        initial_data: Option<&[T]>,
    ) -> Result<Self, EngineError> {
        let initial_data = initial_data.unwrap_or(&[]);
        let region_usage = wgpu::BufferUsages::STORAGE;
        let ping = GpuBuffer::with_capacity(wgpu_context, &format!("{label} (ping)"), capacity, initial_data, region_usage)?;
        let pong = GpuBuffer::with_capacity(wgpu_context, &format!("{label} (pong)"), capacity, initial_data, region_usage)?;
        let presentation = GpuBuffer::with_capacity(
            wgpu_context,
            &format!("{label} (presentation)"),
            capacity,
            initial_data,
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE,
        )?;
        log::debug!("Allocated device double buffer {label} with {capacity} slots per region");
        Ok(Self::from_regions(ping, pong, presentation, capacity))
    }

    /// Records a copy of the source side into the presentation buffer.
    pub fn promote(&mut self, encoder: &mut wgpu::CommandEncoder) {
        let size = self.capacity as u64 * size_of::<T>() as u64;
        let (source, presentation) = self.source_and_presentation();
        if size > 0 {
            encoder.copy_buffer_to_buffer(source.buffer(), 0, presentation.buffer(), 0, size);
        }
    }

    /// Downloads the source side, the latest output of the last phase.
    pub fn download_source(&mut self, wgpu_context: &WgpuContext) -> Result<Vec<T>, EngineError> {
        let index = self.side.source_index();
        Ok(self.regions[index].download(wgpu_context)?.clone())
    }

    pub fn download_presentation(&mut self, wgpu_context: &WgpuContext) -> Result<Vec<T>, EngineError> {
        Ok(self.presentation.download(wgpu_context)?.clone())
    }
}
