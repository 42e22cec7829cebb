use glam::Vec3;

/// Lane batch size of the sort kernels.
pub const SORT_WORKGROUP_SIZE: (u32, u32, u32) = (256, 1, 1);

/// Lane batch size of the cloud update kernel.
pub const CLOUD_UPDATE_WORKGROUP_SIZE: (u32, u32, u32) = (256, 1, 1);

/// Lane batch size of the particle update kernel.
pub const PARTICLE_UPDATE_WORKGROUP_SIZE: (u32, u32, u32) = (128, 1, 1);

/// Cloud count the full-size scene was tuned for (2^16).
pub const MAX_PARTICLE_CLOUDS: u32 = 1 << 16;

pub const PARTICLES_PER_CLOUD: u32 = 8;

/// Seconds between two spawn bursts of a cloud.
pub const DEFAULT_SPAWN_INTERVAL: f32 = 0.5;

/// Lifetime in seconds given to freshly spawned particles.
pub const DEFAULT_PARTICLE_LIFETIME: f32 = 2.0;

/// Spacing between particles of the flat grid layout.
pub const GRID_SPACING: f32 = 0.5;

/// Position coordinate used as sort key.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SortAxis {
    X = 0,
    Y = 1,
    #[default]
    Z = 2,
}

impl SortAxis {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Shape of the simulated scene.
#[derive(Clone, Debug)]
pub enum SceneLayout {
    /// Particles on a square grid, all moving towards the world origin.
    Flat { particles: u32 },
    /// `clouds` clouds, each owning `particles_per_cloud` consecutive particles.
    Clouds { clouds: u32, particles_per_cloud: u32 },
}

#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub layout: SceneLayout,
    pub sort_axis: SortAxis,
    pub world_origin: Vec3,
    pub spawn_interval: f32,
    pub particle_lifetime: f32,
    /// Seed of the scene generator; the same seed always yields the same scene.
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            layout: SceneLayout::Clouds {
                clouds: 4096,
                particles_per_cloud: PARTICLES_PER_CLOUD,
            },
            sort_axis: SortAxis::default(),
            world_origin: Vec3::ZERO,
            spawn_interval: DEFAULT_SPAWN_INTERVAL,
            particle_lifetime: DEFAULT_PARTICLE_LIFETIME,
            seed: 0x5EED,
        }
    }
}

impl SceneConfig {
    pub fn flat(particles: u32) -> Self {
        Self {
            layout: SceneLayout::Flat { particles },
            ..Default::default()
        }
    }

    pub fn clouds(clouds: u32, particles_per_cloud: u32) -> Self {
        Self {
            layout: SceneLayout::Clouds { clouds, particles_per_cloud },
            ..Default::default()
        }
    }

    pub fn num_particles(&self) -> u32 {
        match self.layout {
            SceneLayout::Flat { particles } => particles,
            SceneLayout::Clouds { clouds, particles_per_cloud } => clouds * particles_per_cloud,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.num_particles() == 0 {
            return Err("scene must contain at least one particle".into());
        }
        if let SceneLayout::Clouds { clouds, particles_per_cloud } = self.layout {
            if clouds > MAX_PARTICLE_CLOUDS {
                return Err(format!("at most {MAX_PARTICLE_CLOUDS} clouds are supported, got {clouds}"));
            }
            if clouds.checked_mul(particles_per_cloud).is_none() {
                return Err("particle count overflows u32".into());
            }
        }
        if !(self.spawn_interval > 0.0) {
            return Err("spawn interval must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scene_is_valid() {
        let config = SceneConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_particles(), 4096 * PARTICLES_PER_CLOUD);
    }

    #[test]
    fn empty_scene_is_rejected() {
        assert!(SceneConfig::flat(0).validate().is_err());
        assert!(SceneConfig::clouds(0, 8).validate().is_err());
        assert!(SceneConfig::clouds(MAX_PARTICLE_CLOUDS + 1, 1).validate().is_err());
    }
}
