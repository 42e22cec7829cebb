use glam::Vec3;

use crate::config::{SceneConfig, CLOUD_UPDATE_WORKGROUP_SIZE, PARTICLE_UPDATE_WORKGROUP_SIZE};
use crate::error::EngineError;
use crate::frame_scheduler::FrameStages;
use crate::particles::particle::{Particle, ParticleCloud};
use crate::particles::particle_push_constants::FrameMetadata;
use crate::particles::particle_scene::SceneData;
use crate::particles::simulation_step::{integrate_particle, update_cloud};
use crate::scene::cloud_capacity;
use crate::utils::bitonic_sort::cpu_sorter::CpuBitonicSorter;
use crate::utils::bitonic_sort::{SortElement, SortOutcome};
use crate::utils::double_buffer::DoubleBuffer;
use crate::utils::lane_executor::{scatter, LaneExecutor};

/// A scene simulated on the host lane executor.
pub struct CpuScene {
    particles: DoubleBuffer<Vec<Particle>>,
    clouds: DoubleBuffer<Vec<ParticleCloud>>,
    cloud_count: u32,
    active_particles: u32,
    world_origin: Vec3,
    sorter: CpuBitonicSorter,
    cloud_executor: LaneExecutor,
    particle_executor: LaneExecutor,
}

impl CpuScene {
    pub fn new(config: &SceneConfig) -> Result<Self, EngineError> {
        Self::from_data(SceneData::generate(config)?, config)
    }

    /// Builds a scene from explicit contents, rejecting any that fail
    /// [`SceneData::validate`].
    pub fn from_data(data: SceneData, config: &SceneConfig) -> Result<Self, EngineError> {
        let particle_count = data.particles.len() as u32;
        let cloud_count = data.clouds.len() as u32;
        data.validate()?;

        let mut cloud_data = data.clouds;
        cloud_data.resize(cloud_capacity(cloud_count) as usize, ParticleCloud::sentinel());

        let particles = DoubleBuffer::create(particle_count, Some(data.particles.as_slice()))?;
        let clouds = DoubleBuffer::create(cloud_data.len() as u32, Some(cloud_data.as_slice()))?;
        log::info!("Host scene ready: {particle_count} particles, {cloud_count} clouds");

        Ok(Self {
            particles,
            clouds,
            cloud_count,
            active_particles: data.active_particles,
            world_origin: config.world_origin,
            sorter: CpuBitonicSorter::new(config.sort_axis),
            cloud_executor: LaneExecutor::new(CLOUD_UPDATE_WORKGROUP_SIZE),
            particle_executor: LaneExecutor::new(PARTICLE_UPDATE_WORKGROUP_SIZE),
        })
    }

    /// Particles as of the last present.
    pub fn presented_particles(&self) -> &[Particle] {
        self.particles.presentation()
    }

    pub fn particles(&self) -> &DoubleBuffer<Vec<Particle>> {
        &self.particles
    }

    /// The real clouds, in their current order.
    pub fn clouds(&self) -> &[ParticleCloud] {
        &self.clouds.source()[..self.cloud_count as usize]
    }
}

impl FrameStages for CpuScene {
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
        self.sorter.sort(&mut self.clouds, self.cloud_count)
    }

    fn update_clouds(&mut self, frame: &FrameMetadata) -> Result<(), EngineError> {
        let (cloud_source, cloud_target) = self.clouds.split();
        let (particle_source, particle_target) = self.particles.split();
        let outputs = self.cloud_executor.dispatch_by_items(frame.active_count, |lane| {
            update_cloud(lane, cloud_source[lane as usize], particle_source, frame)
        })?;

        scatter(cloud_target, outputs.iter().map(|output| (output.index, output.cloud)));
        scatter(particle_target, outputs.into_iter().flat_map(|output| output.particles));
        self.clouds.swap();
        self.particles.swap();
        log::debug!("Updated {} clouds", frame.active_count);
        Ok(())
    }

    fn update_particles(&mut self, frame: &FrameMetadata) -> Result<(), EngineError> {
        let (source, target) = self.particles.split();
        let writes = self.particle_executor.dispatch_by_items(frame.active_count, |lane| {
            (lane, integrate_particle(source[lane as usize], frame))
        })?;
        scatter(target, writes);
        self.particles.swap();
        Ok(())
    }

    fn present(&mut self) -> Result<(), EngineError> {
        self.particles.promote();
        Ok(())
    }
}
