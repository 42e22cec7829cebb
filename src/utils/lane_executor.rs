use rayon::prelude::*;
use crate::error::EngineError;
use crate::utils::dispatch_grid;

/// Host-side stand-in for a compute device.
///
/// A dispatch runs `groups * group_width` lanes in parallel. Lanes with an
/// id past `lane_count` idle, exactly like a kernel's early return. Lanes
/// only see what the kernel closure borrows (the source regions) and hand
/// back their writes; the writes become visible once every lane has
/// retired, which is the barrier between two rounds.
#[derive(Copy, Clone, Debug)]
pub struct LaneExecutor {
    group_width: u32,
}

impl LaneExecutor {
    pub fn new(workgroup_size: (u32, u32, u32)) -> Self {
        assert!(workgroup_size.0 > 0, "workgroup width must be positive");
        Self { group_width: workgroup_size.0 }
    }

    pub fn group_width(&self) -> u32 {
        self.group_width
    }

    /// Dispatches enough groups to cover `lane_count` lanes.
    pub fn dispatch_by_items<O, F>(&self, lane_count: u32, kernel: F) -> Result<Vec<O>, EngineError>
    where
        O: Send,
        F: Fn(u32) -> O + Sync + Send,
    {
        let groups = dispatch_grid::group_count(lane_count, self.group_width);
        self.dispatch(groups, lane_count, kernel)
    }

    /// Runs `groups` groups; returns the output of every active lane in lane order.
    pub fn dispatch<O, F>(&self, groups: u32, lane_count: u32, kernel: F) -> Result<Vec<O>, EngineError>
    where
        O: Send,
        F: Fn(u32) -> O + Sync + Send,
    {
        dispatch_grid::ensure_covers(groups, self.group_width, lane_count)?;
        let total_lanes = groups as u64 * self.group_width as u64;
        let outputs = (0..total_lanes)
            .into_par_iter()
            .filter(|lane| *lane < lane_count as u64)
            .map(|lane| kernel(lane as u32))
            .collect();
        Ok(outputs)
    }
}

/// Applies lane writes to a target region.
///
/// Each slot may be written by at most one lane per round; two lanes
/// writing the same slot is a usage error that debug builds catch.
pub fn scatter<T: Copy>(target: &mut [T], writes: impl IntoIterator<Item = (u32, T)>) {
    #[cfg(debug_assertions)]
    let mut written = vec![false; target.len()];

    for (index, value) in writes {
        #[cfg(debug_assertions)]
        {
            assert!(
                !std::mem::replace(&mut written[index as usize], true),
                "slot {index} written by two lanes in one round"
            );
        }
        target[index as usize] = value;
    }
}
