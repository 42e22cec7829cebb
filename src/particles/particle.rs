use std::borrow::Cow;

use glam::{Vec2, Vec3};

use crate::config::SortAxis;
use crate::utils::bitonic_sort::gpu_sorter::GpuSortElement;
use crate::utils::bitonic_sort::SortElement;

pub(crate) const PARTICLE_TYPES_WGSL: &str = include_str!("particle_types.wgsl");

/// A point particle. Inactive while `lifetime <= 0`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Particle {
    pub position: Vec3,
    pub lifetime: f32,
    pub velocity: Vec3,
    /// Non-zero only in padded sort slots.
    pub phantom: u32,
    pub color: Vec3,
    pub _pad1: f32,
    pub scale: Vec2,
    pub _pad2: Vec2,
}

impl Particle {
    pub fn new(position: Vec3, velocity: Vec3, color: Vec3, scale: Vec2, lifetime: f32) -> Self {
        Self {
            position,
            lifetime,
            velocity,
            color,
            scale,
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.lifetime > 0.0
    }
}

/// A cluster of particles sharing one sort key.
///
/// The cloud owns the particles `particle_start..particle_start + particle_count`
/// and respawns its inactive ones every `spawn_interval` seconds.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleCloud {
    pub position: Vec3,
    pub radius: f32,
    pub velocity: Vec3,
    pub timer: f32,
    pub color: Vec3,
    pub spawn_interval: f32,
    pub particle_start: u32,
    pub particle_count: u32,
    pub active_count: u32,
    pub particle_lifetime: f32,
    /// Non-zero only in padded sort slots.
    pub phantom: u32,
    pub _pad0: [u32; 3],
}

impl ParticleCloud {
    pub fn particle_range(&self) -> std::ops::Range<u32> {
        self.particle_start..self.particle_start + self.particle_count
    }
}

impl SortElement for Particle {
    type Key = f32;

    fn sort_key(&self, axis: SortAxis) -> f32 {
        self.position[axis.index()]
    }

    fn sentinel() -> Self {
        Self {
            position: Vec3::splat(f32::MAX),
            phantom: 1,
            ..Default::default()
        }
    }

    fn is_phantom(&self) -> bool {
        self.phantom != 0
    }
}

impl SortElement for ParticleCloud {
    type Key = f32;

    fn sort_key(&self, axis: SortAxis) -> f32 {
        self.position[axis.index()]
    }

    /// Owns no particles, so an update that reaches it changes nothing.
    fn sentinel() -> Self {
        Self {
            position: Vec3::splat(f32::MAX),
            phantom: 1,
            ..Default::default()
        }
    }

    fn is_phantom(&self) -> bool {
        self.phantom != 0
    }
}

impl GpuSortElement for Particle {
    fn wgsl_element() -> Cow<'static, str> {
        Cow::Owned(format!(
            "{PARTICLE_TYPES_WGSL}\n\
             alias Element = Particle;\n\
             fn element_less(a: Element, b: Element, axis: u32) -> bool {{ return sorts_before(a.phantom, b.phantom, a.position[axis], b.position[axis]); }}\n\
             fn sentinel_element() -> Element {{ return particle_sentinel(); }}\n"
        ))
    }
}

impl GpuSortElement for ParticleCloud {
    fn wgsl_element() -> Cow<'static, str> {
        Cow::Owned(format!(
            "{PARTICLE_TYPES_WGSL}\n\
             alias Element = ParticleCloud;\n\
             fn element_less(a: Element, b: Element, axis: u32) -> bool {{ return sorts_before(a.phantom, b.phantom, a.position[axis], b.position[axis]); }}\n\
             fn sentinel_element() -> Element {{ return cloud_sentinel(); }}\n"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_match_the_shaders() {
        assert_eq!(size_of::<Particle>(), 64);
        assert_eq!(size_of::<ParticleCloud>(), 80);
        assert_eq!(std::mem::offset_of!(Particle, velocity), 16);
        assert_eq!(std::mem::offset_of!(Particle, phantom), 28);
        assert_eq!(std::mem::offset_of!(Particle, color), 32);
        assert_eq!(std::mem::offset_of!(Particle, scale), 48);
        assert_eq!(std::mem::offset_of!(ParticleCloud, particle_start), 48);
        assert_eq!(std::mem::offset_of!(ParticleCloud, phantom), 64);
    }

    #[test]
    fn sentinel_sorts_after_real_clouds() {
        let cloud = ParticleCloud { position: Vec3::new(1.0e30, -4.0, 2.0), ..Default::default() };
        for axis in [SortAxis::X, SortAxis::Y, SortAxis::Z] {
            assert!(cloud.sort_key(axis) < ParticleCloud::sentinel().sort_key(axis));
        }
        assert!(ParticleCloud::sentinel().particle_range().is_empty());
    }

    #[test]
    fn sentinel_follows_clouds_with_extreme_keys() {
        let sentinel = ParticleCloud::sentinel();
        for z in [f32::MAX, f32::INFINITY] {
            let cloud = ParticleCloud { position: Vec3::new(0.0, 0.0, z), ..Default::default() };
            assert!(cloud.sorts_before(&sentinel, SortAxis::Z));
            assert!(!sentinel.sorts_before(&cloud, SortAxis::Z));
        }
        assert!(!sentinel.sorts_before(&sentinel, SortAxis::Z));
    }
}
