use crate::config::{SortAxis, SORT_WORKGROUP_SIZE};
use crate::error::EngineError;
use crate::utils::bitonic_sort::network::{SortMetadata, SortPlan, SortRound};
use crate::utils::bitonic_sort::{skipped_outcome, SortElement, SortOutcome};
use crate::utils::dispatch_grid;
use crate::utils::double_buffer::DoubleBuffer;
use crate::utils::lane_executor::{scatter, LaneExecutor};

/// Runs the bitonic network on the host lane executor.
pub struct CpuBitonicSorter {
    executor: LaneExecutor,
    axis: SortAxis,
}

impl CpuBitonicSorter {
    pub fn new(axis: SortAxis) -> Self {
        Self { executor: LaneExecutor::new(SORT_WORKGROUP_SIZE), axis }
    }

    /// Sorts the first `element_count` elements of `buffer` ascending.
    ///
    /// Every round reads the source, writes the target and swaps once all
    /// lanes retired, so on return `buffer.source()` holds the sorted
    /// prefix followed by sentinels up to the padded size.
    pub fn sort<T: SortElement>(&self, buffer: &mut DoubleBuffer<Vec<T>>, element_count: u32) -> Result<SortOutcome, EngineError> {
        if let Some(outcome) = skipped_outcome(element_count) {
            log::trace!("Skipping sort of {element_count} elements");
            return Ok(outcome);
        }

        let plan = SortPlan::new(element_count);
        if buffer.capacity() < plan.padded_count() {
            return Err(EngineError::CapacityTooSmall {
                element_count,
                required: plan.padded_count(),
                capacity: buffer.capacity(),
            });
        }

        let groups = dispatch_grid::checked_group_count(plan.thread_count(), self.executor.group_width())?;
        log::debug!(
            "Bitonic sort of {} elements: {} rounds, {} lanes in {} groups",
            element_count,
            plan.rounds().len(),
            plan.thread_count(),
            groups
        );

        for (index, round) in plan.rounds().iter().enumerate() {
            let metadata = plan.metadata(index, self.axis);
            let (source, target) = buffer.split();
            let writes = self.executor.dispatch(groups, metadata.thread_count, |lane| {
                compare_lane(round, &metadata, source, lane, self.axis)
            })?;
            scatter(target, writes.into_iter().flatten());
            buffer.swap();
            log::trace!("Sort round {index}: {:?} step {} set {}", round.phase, round.step, round.set_step);
        }

        Ok(SortOutcome::Sorted { rounds: plan.rounds().len() as u32 })
    }
}

fn compare_lane<T: SortElement>(round: &SortRound, metadata: &SortMetadata, source: &[T], lane: u32, axis: SortAxis) -> [(u32, T); 2] {
    let (self_id, other_id) = round.lane_pair(metadata.thread_count, lane);
    let mut first = load(source, self_id, metadata);
    let mut second = load(source, other_id, metadata);
    if second.sorts_before(&first, axis) {
        std::mem::swap(&mut first, &mut second);
    }
    [(self_id, first), (other_id, second)]
}

/// Slots past the element count only exist virtually in the first round.
fn load<T: SortElement>(source: &[T], index: u32, metadata: &SortMetadata) -> T {
    if metadata.init_flag != 0 && index >= metadata.element_count {
        return T::sentinel();
    }
    source[index as usize]
}
