use wgpu::Adapter;

use crate::error::EngineError;

/// Headless device, queue and adapter shared by every GPU component.
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter: Adapter,
}

impl WgpuContext {
    pub async fn new() -> Result<Self, EngineError> {
        // The instance is a handle to our GPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        Self::from_adapter(adapter, "Simulation Device").await
    }

    pub async fn new_for_test() -> Result<Self, EngineError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        Self::from_adapter(adapter, "Test Device").await
    }

    async fn from_adapter(adapter: Adapter, label: &str) -> Result<Self, EngineError> {
        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: Self::required_features(&adapter)?,
                required_limits: Self::get_limits(&adapter),
                ..Default::default()
            })
            .await?;

        Ok(Self { device, queue, adapter })
    }

    /// Push constants carry the per-round metadata and are mandatory.
    /// Timestamp queries only feed the profiler and are taken when offered.
    fn required_features(adapter: &Adapter) -> Result<wgpu::Features, EngineError> {
        let available = adapter.features();
        if !available.contains(wgpu::Features::PUSH_CONSTANTS) {
            return Err(EngineError::Device("adapter does not support push constants".into()));
        }
        let timestamps = wgpu::Features::TIMESTAMP_QUERY | wgpu::Features::TIMESTAMP_QUERY_INSIDE_ENCODERS;
        Ok(wgpu::Features::PUSH_CONSTANTS | (available & timestamps))
    }

    fn get_limits(adapter: &Adapter) -> wgpu::Limits {
        // Use the adapter's reported limits so push constants get their full size
        adapter.limits()
    }

    /// Submits `encoder` and blocks until the GPU retired it.
    pub fn submit_and_wait(&self, encoder: wgpu::CommandEncoder) -> Result<(), EngineError> {
        let index = self.queue.submit(std::iter::once(encoder.finish()));
        self.device.poll(wgpu::wgt::PollType::WaitForSubmissionIndex(index))?;
        Ok(())
    }

    pub fn get_device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn get_queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn get_adapter(&self) -> &Adapter {
        &self.adapter
    }
}
