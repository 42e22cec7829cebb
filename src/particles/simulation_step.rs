/*
    Per-lane update rules of the two simulation kernels.

    Host scenes call these directly from the lane executor; particle_update.wgsl
    and cloud_update.wgsl implement the same rules for the device.
*/

use crate::particles::particle::{Particle, ParticleCloud};
use crate::particles::particle_push_constants::FrameMetadata;

/// Integrates one particle. Particles that expire this step are parked at
/// the world origin.
pub fn integrate_particle(particle: Particle, frame: &FrameMetadata) -> Particle {
    if !frame.is_active() || !particle.is_active() {
        return particle;
    }
    let mut particle = particle;
    particle.position += particle.velocity * frame.delta_time;
    particle.lifetime -= frame.delta_time;
    if !particle.is_active() {
        particle.position = frame.world_origin;
    }
    particle
}

/// What one cloud lane writes: its own slot plus every owned particle slot.
#[derive(Clone, Debug)]
pub struct CloudLaneOutput {
    pub index: u32,
    pub cloud: ParticleCloud,
    pub particles: Vec<(u32, Particle)>,
}

/// Moves a cloud, advances its spawn timer and copies its owned particles,
/// respawning the inactive ones when the timer fires.
pub fn update_cloud(index: u32, cloud: ParticleCloud, particles: &[Particle], frame: &FrameMetadata) -> CloudLaneOutput {
    let mut cloud = cloud;
    let mut spawn = false;
    if frame.is_active() {
        cloud.position += cloud.velocity * frame.delta_time;
        cloud.timer += frame.delta_time;
        if cloud.timer >= cloud.spawn_interval {
            cloud.timer = 0.0;
            spawn = true;
        }
    }

    let mut active_count = 0;
    let owned = cloud
        .particle_range()
        .map(|particle_index| {
            let mut particle = particles[particle_index as usize];
            if spawn && !particle.is_active() {
                particle.position = cloud.position;
                particle.color = cloud.color;
                particle.lifetime = cloud.particle_lifetime;
            }
            if particle.is_active() {
                active_count += 1;
            }
            (particle_index, particle)
        })
        .collect();
    cloud.active_count = active_count;

    CloudLaneOutput { index, cloud, particles: owned }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::*;

    fn frame(delta_time: f32) -> FrameMetadata {
        FrameMetadata::new(delta_time, 1, Vec3::new(0.0, -1.0, 0.0), true)
    }

    #[test]
    fn live_particle_moves_and_ages() {
        let particle = Particle::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::ONE, Vec2::ONE, 1.0);
        let updated = integrate_particle(particle, &frame(0.25));
        assert_eq!(updated.position, Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(updated.lifetime, 0.75);
    }

    #[test]
    fn expiring_particle_is_parked_at_origin() {
        let particle = Particle::new(Vec3::ONE, Vec3::ONE, Vec3::ONE, Vec2::ONE, 0.1);
        let updated = integrate_particle(particle, &frame(0.5));
        assert!(!updated.is_active());
        assert_eq!(updated.position, Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn paused_frame_copies_unchanged() {
        let particle = Particle::new(Vec3::ONE, Vec3::ONE, Vec3::ONE, Vec2::ONE, 1.0);
        let paused = FrameMetadata::new(0.5, 1, Vec3::ZERO, false);
        assert_eq!(integrate_particle(particle, &paused), particle);
    }

    #[test]
    fn cloud_respawns_inactive_particles_when_timer_fires() {
        let live = Particle::new(Vec3::splat(5.0), Vec3::ZERO, Vec3::ZERO, Vec2::ONE, 1.0);
        let dead = Particle::default();
        let particles = vec![dead, live, dead];
        let cloud = ParticleCloud {
            position: Vec3::ZERO,
            velocity: Vec3::new(0.0, 0.0, 4.0),
            timer: 0.4,
            color: Vec3::X,
            spawn_interval: 0.5,
            particle_start: 1,
            particle_count: 2,
            particle_lifetime: 3.0,
            ..Default::default()
        };

        let output = update_cloud(0, cloud, &particles, &frame(0.25));
        assert_eq!(output.cloud.timer, 0.0);
        assert_eq!(output.cloud.position, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(output.cloud.active_count, 2);
        assert_eq!(output.particles.len(), 2);
        assert_eq!(output.particles[0], (1, live));
        let (index, spawned) = output.particles[1];
        assert_eq!(index, 2);
        assert_eq!(spawned.position, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(spawned.color, Vec3::X);
        assert_eq!(spawned.lifetime, 3.0);
    }

    #[test]
    fn cloud_timer_accumulates_below_interval() {
        let cloud = ParticleCloud { spawn_interval: 1.0, particle_count: 1, ..Default::default() };
        let particles = vec![Particle::default()];
        let output = update_cloud(0, cloud, &particles, &frame(0.25));
        assert_eq!(output.cloud.timer, 0.25);
        assert_eq!(output.cloud.active_count, 0);
        assert!(!output.particles[0].1.is_active());
    }
}
