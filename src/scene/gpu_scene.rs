use glam::Vec3;
use wgpu_profiler::{GpuProfiler, GpuProfilerSettings};

use crate::config::SceneConfig;
use crate::error::EngineError;
use crate::frame_scheduler::FrameStages;
use crate::particles::particle::{Particle, ParticleCloud};
use crate::particles::particle_integration::{CloudRegions, ParticleIntegration, ParticleRegions};
use crate::particles::particle_push_constants::FrameMetadata;
use crate::particles::particle_scene::SceneData;
use crate::scene::cloud_capacity;
use crate::utils::bitonic_sort::gpu_sorter::GpuBitonicSorter;
use crate::utils::bitonic_sort::{SortElement, SortOutcome};
use crate::utils::double_buffer::DoubleBuffer;
use crate::wgpu_context::WgpuContext;

/// A scene simulated on the device. Every phase is recorded into its own
/// encoder, submitted, and waited for before the phase returns.
pub struct GpuScene {
    wgpu_context: WgpuContext,
    gpu_profiler: GpuProfiler,
    particles: ParticleRegions,
    clouds: CloudRegions,
    cloud_count: u32,
    active_particles: u32,
    world_origin: Vec3,
    sorter: GpuBitonicSorter<ParticleCloud>,
    integration: ParticleIntegration,
}

impl GpuScene {
    pub fn new(wgpu_context: WgpuContext, config: &SceneConfig) -> Result<Self, EngineError> {
        let data = SceneData::generate(config)?;
        Self::from_data(wgpu_context, data, config)
    }

    pub fn from_data(wgpu_context: WgpuContext, data: SceneData, config: &SceneConfig) -> Result<Self, EngineError> {
        let particle_count = data.particles.len() as u32;
        let cloud_count = data.clouds.len() as u32;
        data.validate()?;

        let mut cloud_data = data.clouds;
        cloud_data.resize(cloud_capacity(cloud_count) as usize, ParticleCloud::sentinel());

        let particles = DoubleBuffer::create_on_device(&wgpu_context, "Particles", particle_count, Some(data.particles.as_slice()))?;
        let clouds = DoubleBuffer::create_on_device(&wgpu_context, "Particle clouds", cloud_data.len() as u32, Some(cloud_data.as_slice()))?;

        let sorter = GpuBitonicSorter::new(&wgpu_context, &clouds, config.sort_axis);
        let integration = ParticleIntegration::new(&wgpu_context, &particles, &clouds);
        let gpu_profiler = GpuProfiler::new(wgpu_context.get_device(), GpuProfilerSettings::default())
            .map_err(|err| EngineError::Device(err.to_string()))?;
        log::info!("Device scene ready: {particle_count} particles, {cloud_count} clouds");

        Ok(Self {
            wgpu_context,
            gpu_profiler,
            particles,
            clouds,
            cloud_count,
            active_particles: data.active_particles,
            world_origin: config.world_origin,
            sorter,
            integration,
        })
    }

    pub fn wgpu_context(&self) -> &WgpuContext {
        &self.wgpu_context
    }

    /// Downloads the presentation buffer.
    pub fn download_presented_particles(&mut self) -> Result<Vec<Particle>, EngineError> {
        self.particles.download_presentation(&self.wgpu_context)
    }

    /// Downloads the real clouds in their current order.
    pub fn download_clouds(&mut self) -> Result<Vec<ParticleCloud>, EngineError> {
        let mut clouds = self.clouds.download_source(&self.wgpu_context)?;
        clouds.truncate(self.cloud_count as usize);
        Ok(clouds)
    }

    fn create_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.wgpu_context
            .get_device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Submits one phase and blocks until it retired.
    fn finish_phase(&mut self, mut encoder: wgpu::CommandEncoder) -> Result<(), EngineError> {
        self.gpu_profiler.resolve_queries(&mut encoder);
        self.wgpu_context.submit_and_wait(encoder)?;
        self.gpu_profiler
            .end_frame()
            .map_err(|err| EngineError::Device(err.to_string()))?;

        let timestamp_period = self.wgpu_context.get_queue().get_timestamp_period();
        if let Some(results) = self.gpu_profiler.process_finished_frame(timestamp_period) {
            for result in results {
                if let Some(time) = result.time {
                    log::trace!("{}: {:.3} ms", result.label, (time.end - time.start) * 1000.0);
                }
            }
        }
        Ok(())
    }
}

impl FrameStages for GpuScene {
    fn cloud_count(&self) -> u32 {
        self.cloud_count
    }

    fn active_particle_count(&self) -> u32 {
        self.active_particles
    }

    fn world_origin(&self) -> Vec3 {
        self.world_origin
    }

    fn sort_clouds(&mut self) -> Result<SortOutcome, EngineError> {
        let mut encoder = self.create_encoder("Cloud sort encoder");
        let outcome = self
            .sorter
            .sort(&mut encoder, &mut self.gpu_profiler, &mut self.clouds, self.cloud_count)?;
        self.finish_phase(encoder)?;
        Ok(outcome)
    }

    fn update_clouds(&mut self, frame: &FrameMetadata) -> Result<(), EngineError> {
        let mut encoder = self.create_encoder("Cloud update encoder");
        self.integration
            .update_clouds(&mut encoder, &mut self.gpu_profiler, &mut self.clouds, &mut self.particles, frame)?;
        self.finish_phase(encoder)
    }

    fn update_particles(&mut self, frame: &FrameMetadata) -> Result<(), EngineError> {
        let mut encoder = self.create_encoder("Particle update encoder");
        self.integration
            .update_particles(&mut encoder, &mut self.gpu_profiler, &mut self.particles, frame)?;
        self.finish_phase(encoder)
    }

    fn present(&mut self) -> Result<(), EngineError> {
        let mut encoder = self.create_encoder("Present encoder");
        self.particles.promote(&mut encoder);
        self.finish_phase(encoder)
    }
}
