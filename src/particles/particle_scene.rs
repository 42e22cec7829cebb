use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{SceneConfig, SceneLayout, GRID_SPACING};
use crate::error::EngineError;
use crate::particles::particle::{Particle, ParticleCloud};
use crate::utils::bitonic_sort::SortElement;

const PARTICLE_SCALE: Vec2 = Vec2::splat(0.2);
const FLAT_COLOR: Vec3 = Vec3::new(0.0, 0.2, 0.0);
const CLOUD_RADIUS: f32 = 1.0;
/// Half extent of the cube clouds are scattered in.
const CLOUD_EXTENT: f32 = 50.0;
const CLOUD_SPEED: f32 = 2.0;
const PARTICLE_SPEED: f32 = 1.5;

/// Initial contents of a scene, identical on both substrates.
#[derive(Clone, Debug)]
pub struct SceneData {
    pub particles: Vec<Particle>,
    pub clouds: Vec<ParticleCloud>,
    /// Particles the particle kernel runs over each frame.
    pub active_particles: u32,
}

impl SceneData {
    pub fn generate(config: &SceneConfig) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::Config)?;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let scene = match config.layout {
            SceneLayout::Flat { particles } => Self::flat(particles, config),
            SceneLayout::Clouds { clouds, particles_per_cloud } => {
                Self::clouds(&mut rng, clouds, particles_per_cloud, config)
            }
        };
        scene.validate()?;
        log::info!(
            "Generated scene with {} particles in {} clouds",
            scene.particles.len(),
            scene.clouds.len()
        );
        Ok(scene)
    }

    /// A square grid in the xz plane, every particle heading for the origin.
    /// Slots past the largest square stay inactive.
    fn flat(count: u32, config: &SceneConfig) -> Self {
        let side = (count as f64).sqrt() as u32;
        let mut particles = vec![Particle::default(); count as usize];
        for z in 0..side {
            for x in 0..side {
                let position = Vec3::new(x as f32, 0.0, z as f32) * GRID_SPACING;
                let velocity = -(position - config.world_origin).normalize_or_zero();
                particles[(z * side + x) as usize] =
                    Particle::new(position, velocity, FLAT_COLOR, PARTICLE_SCALE, f32::INFINITY);
            }
        }
        Self {
            particles,
            clouds: Vec::new(),
            active_particles: side * side,
        }
    }

    /// Clouds scattered in a cube, each owning a consecutive run of
    /// initially inactive particles.
    fn clouds(rng: &mut StdRng, clouds: u32, particles_per_cloud: u32, config: &SceneConfig) -> Self {
        let mut particles = Vec::with_capacity((clouds * particles_per_cloud) as usize);
        let cloud_list = (0..clouds)
            .map(|index| {
                let position = config.world_origin + random_vec3(rng, CLOUD_EXTENT);
                for _ in 0..particles_per_cloud {
                    let velocity = random_vec3(rng, PARTICLE_SPEED);
                    particles.push(Particle::new(position, velocity, Vec3::ZERO, PARTICLE_SCALE, 0.0));
                }
                ParticleCloud {
                    position,
                    radius: CLOUD_RADIUS,
                    velocity: random_vec3(rng, CLOUD_SPEED),
                    // Spread the first spawn over one interval
                    timer: rng.random_range(0.0..config.spawn_interval),
                    color: Vec3::new(
                        rng.random_range(0.3..0.8),
                        rng.random_range(0.3..0.8),
                        rng.random_range(0.3..0.8),
                    ),
                    spawn_interval: config.spawn_interval,
                    particle_start: index * particles_per_cloud,
                    particle_count: particles_per_cloud,
                    active_count: 0,
                    particle_lifetime: config.particle_lifetime,
                    ..Default::default()
                }
            })
            .collect();
        let active_particles = particles.len() as u32;
        Self {
            particles,
            clouds: cloud_list,
            active_particles,
        }
    }

    /// Rejects contents that would let a kernel read past the particle array
    /// or mistake a real record for padding.
    pub fn validate(&self) -> Result<(), EngineError> {
        let particle_count = self.particles.len() as u32;
        if self.active_particles > particle_count {
            return Err(EngineError::Config(format!(
                "{} active particles in a scene of {particle_count}",
                self.active_particles
            )));
        }
        if self.particles.iter().any(Particle::is_phantom) || self.clouds.iter().any(ParticleCloud::is_phantom) {
            return Err(EngineError::Config("scene contains padding records".to_string()));
        }
        validate_cloud_ranges(&self.clouds, particle_count)
    }
}

fn random_vec3(rng: &mut StdRng, extent: f32) -> Vec3 {
    Vec3::new(
        rng.random_range(-extent..extent),
        rng.random_range(-extent..extent),
        rng.random_range(-extent..extent),
    )
}

/// Checks that cloud ranges lie inside the particle array, are pairwise
/// disjoint and together cover every particle, so the cloud phase writes
/// each particle slot exactly once.
pub fn validate_cloud_ranges(clouds: &[ParticleCloud], particle_capacity: u32) -> Result<(), EngineError> {
    if clouds.is_empty() {
        return Ok(());
    }

    let mut ranges: Vec<(u32, u32, u32)> = Vec::with_capacity(clouds.len());
    for (index, cloud) in clouds.iter().enumerate() {
        let cloud_index = index as u32;
        let start = cloud.particle_start;
        let end = start.checked_add(cloud.particle_count).ok_or(EngineError::CloudRange {
            cloud: cloud_index,
            start,
            end: u32::MAX,
            reason: "range overflows",
        })?;
        if end > particle_capacity {
            return Err(EngineError::CloudRange { cloud: cloud_index, start, end, reason: "range exceeds particle capacity" });
        }
        ranges.push((start, end, cloud_index));
    }

    ranges.sort_unstable();
    let mut covered_until = 0;
    for &(start, end, cloud) in &ranges {
        if start < covered_until {
            return Err(EngineError::CloudRange { cloud, start, end, reason: "range overlaps another cloud" });
        }
        if start > covered_until {
            return Err(EngineError::CloudRange { cloud, start, end, reason: "particles before this range have no owner" });
        }
        covered_until = end;
    }
    if covered_until != particle_capacity {
        let &(start, end, cloud) = ranges.last().unwrap_or(&(0, 0, 0));
        return Err(EngineError::CloudRange { cloud, start, end, reason: "trailing particles have no owner" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud(start: u32, count: u32) -> ParticleCloud {
        ParticleCloud { particle_start: start, particle_count: count, ..Default::default() }
    }

    #[test]
    fn contiguous_ranges_in_any_order_are_accepted() {
        let clouds = [cloud(4, 4), cloud(0, 2), cloud(2, 2)];
        assert!(validate_cloud_ranges(&clouds, 8).is_ok());
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        let clouds = [cloud(0, 4), cloud(3, 5)];
        assert!(matches!(
            validate_cloud_ranges(&clouds, 8),
            Err(EngineError::CloudRange { cloud: 1, .. })
        ));
    }

    #[test]
    fn out_of_capacity_and_gaps_are_rejected() {
        assert!(validate_cloud_ranges(&[cloud(0, 9)], 8).is_err());
        assert!(validate_cloud_ranges(&[cloud(0, 2), cloud(3, 5)], 8).is_err());
        assert!(validate_cloud_ranges(&[cloud(0, 6)], 8).is_err());
    }

    #[test]
    fn same_seed_generates_same_scene() {
        let config = SceneConfig::clouds(16, 4);
        let a = SceneData::generate(&config).unwrap();
        let b = SceneData::generate(&config).unwrap();
        assert_eq!(a.clouds, b.clouds);
        assert_eq!(a.particles, b.particles);
        assert_eq!(a.active_particles, 64);
        assert!(a.particles.iter().all(|particle| !particle.is_active()));
    }

    #[test]
    fn active_count_beyond_the_particles_is_rejected() {
        let mut scene = SceneData::generate(&SceneConfig::flat(4)).unwrap();
        scene.active_particles = 10;
        assert!(matches!(scene.validate(), Err(EngineError::Config(_))));
        scene.active_particles = 4;
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn padding_records_are_rejected() {
        let mut scene = SceneData::generate(&SceneConfig::clouds(2, 2)).unwrap();
        scene.clouds[1].phantom = 1;
        assert!(matches!(scene.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn flat_scene_activates_the_largest_square() {
        let scene = SceneData::generate(&SceneConfig::flat(10)).unwrap();
        assert_eq!(scene.active_particles, 9);
        assert!(scene.clouds.is_empty());
        assert!(scene.particles[..9].iter().all(Particle::is_active));
        assert!(!scene.particles[9].is_active());
    }
}
