use glam::Vec3;

/// Per-dispatch parameters of the simulation kernels, pushed as push constants.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameMetadata {
    pub delta_time: f32,
    /// Number of lanes the dispatch runs; lanes past it return at once.
    pub active_count: u32,
    /// Zero freezes the simulation while still copying every element.
    pub active_flag: u32,
    pub _pad0: u32,
    /// Where expired particles are parked.
    pub world_origin: Vec3,
    pub _pad1: f32,
}

impl FrameMetadata {
    pub fn new(delta_time: f32, active_count: u32, world_origin: Vec3, active: bool) -> Self {
        Self {
            delta_time,
            active_count,
            active_flag: active as u32,
            _pad0: 0,
            world_origin,
            _pad1: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_flag != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_is_push_constant_sized() {
        assert_eq!(size_of::<FrameMetadata>(), 32);
        assert_eq!(std::mem::offset_of!(FrameMetadata, world_origin), 16);
    }
}
