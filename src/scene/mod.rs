pub mod cpu_scene;
pub mod gpu_scene;

use crate::utils::dispatch_grid::ceil_pow2;

/// Cloud region capacity: the padded sort domain of `clouds` clouds.
pub(crate) fn cloud_capacity(clouds: u32) -> u32 {
    ceil_pow2(clouds.max(1))
}
