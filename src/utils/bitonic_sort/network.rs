/*
    Index arithmetic of the generalized bitonic sorting network.

    The network sorts an arbitrary number of elements by padding the sort
    domain to the next power of two P. Every round dispatches P/2 lanes and
    each lane owns exactly one (self, other) pair, so a round touches every
    slot of [0, P) exactly once.

    INIT   builds bitonic runs inside sets of 4 * set_step slots. The left
           half of a set is ordered ascending, the right half is mirrored
           (descending). Every set_step is completed by halving rounds down
           to a distance of 1.
    SWAP   turns the two halves of the domain into one ascending and one
           descending run, i.e. one bitonic sequence of length P.
    MERGE  standard bitonic merge over the whole domain.

    The same rules are implemented in bitonic_sort.wgsl.
*/

use crate::config::SortAxis;
use crate::utils::dispatch_grid::ceil_pow2;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SortPhase {
    Init,
    Swap,
    Merge,
}

impl SortPhase {
    pub fn entry_point(self) -> &'static str {
        match self {
            SortPhase::Init => "sort_init",
            SortPhase::Swap => "sort_swap",
            SortPhase::Merge => "sort_merge",
        }
    }
}

/// One dispatch of the network at a fixed step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SortRound {
    pub phase: SortPhase,
    /// Distance between the two slots of a pair.
    pub step: u32,
    /// Set parameter of INIT rounds (sets hold `4 * set_step` slots). Equal to `step` otherwise.
    pub set_step: u32,
}

impl SortRound {
    /// Slots read and written by lane `lane`; the first one receives the smaller key.
    pub fn lane_pair(&self, thread_count: u32, lane: u32) -> (u32, u32) {
        let step = self.step;
        match self.phase {
            SortPhase::Init => {
                let set_len = 4 * self.set_step;
                let threads_per_set = set_len / 2;
                let set_start = (lane / threads_per_set) * set_len;
                let right_side = (lane % threads_per_set) >= threads_per_set / 2;
                let local = lane % self.set_step;
                let mut offset = (local % step) + (local / step) * 2 * step;
                if right_side {
                    offset += 2 * self.set_step;
                }
                let self_id = set_start + offset;
                mirror(right_side, self_id, self_id + step)
            }
            SortPhase::Swap => {
                let right_side = lane >= thread_count / 2;
                let self_id = (lane % step) + (lane / step) * 2 * step;
                mirror(right_side, self_id, self_id + step)
            }
            SortPhase::Merge => {
                let self_id = (lane % step) + (lane / step) * 2 * step;
                (self_id, self_id + step)
            }
        }
    }
}

fn mirror(right_side: bool, self_id: u32, other_id: u32) -> (u32, u32) {
    if right_side { (other_id, self_id) } else { (self_id, other_id) }
}

/// Parameters of one sort dispatch, pushed to the kernel before every round.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SortMetadata {
    pub step: u32,
    pub set_step: u32,
    pub element_count: u32,
    pub thread_count: u32,
    /// Non-zero only for the very first round: out-of-range reads yield the sentinel.
    pub init_flag: u32,
    pub axis: u32,
    pub _padding: [u32; 2],
}

/// Every round of the network for one element count, in execution order.
#[derive(Clone, Debug)]
pub struct SortPlan {
    element_count: u32,
    padded_count: u32,
    thread_count: u32,
    rounds: Vec<SortRound>,
}

impl SortPlan {
    pub fn new(element_count: u32) -> Self {
        if element_count <= 1 {
            // 0 elements: nothing to sort. 1 element: the domain would need 0 lanes.
            return Self {
                element_count,
                padded_count: element_count,
                thread_count: 0,
                rounds: Vec::new(),
            };
        }

        let padded_count = ceil_pow2(element_count);
        let thread_count = padded_count / 2;
        let mut rounds = Vec::new();

        let mut set_step = 1;
        while set_step <= thread_count / 4 {
            let mut step = set_step;
            while step >= 1 {
                rounds.push(SortRound { phase: SortPhase::Init, step, set_step });
                step /= 2;
            }
            set_step *= 2;
        }

        let mut step = thread_count / 2;
        while step >= 1 {
            rounds.push(SortRound { phase: SortPhase::Swap, step, set_step: step });
            step /= 2;
        }

        let mut step = thread_count;
        while step >= 1 {
            rounds.push(SortRound { phase: SortPhase::Merge, step, set_step: step });
            step /= 2;
        }

        Self { element_count, padded_count, thread_count, rounds }
    }

    /// Size of the virtual sort domain; regions must hold at least this many slots.
    pub fn padded_count(&self) -> u32 {
        self.padded_count
    }

    pub fn thread_count(&self) -> u32 {
        self.thread_count
    }

    pub fn rounds(&self) -> &[SortRound] {
        &self.rounds
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Metadata of round `index`, rebuilt from scratch.
    pub fn metadata(&self, index: usize, axis: SortAxis) -> SortMetadata {
        let round = self.rounds[index];
        SortMetadata {
            step: round.step,
            set_step: round.set_step,
            element_count: self.element_count,
            thread_count: self.thread_count,
            init_flag: (index == 0) as u32,
            axis: axis as u32,
            _padding: [0; 2],
        }
    }

    /// True if the lanes of `round` own every slot of the padded domain exactly once.
    pub fn partitions_domain(&self, round: &SortRound) -> bool {
        let mut owned = vec![false; self.padded_count as usize];
        for lane in 0..self.thread_count {
            let (self_id, other_id) = round.lane_pair(self.thread_count, lane);
            for index in [self_id, other_id] {
                match owned.get_mut(index as usize) {
                    Some(slot) if !*slot => *slot = true,
                    _ => return false,
                }
            }
        }
        owned.into_iter().all(|slot| slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_elements_follow_the_three_phases() {
        let plan = SortPlan::new(8);
        assert_eq!(plan.thread_count(), 4);
        let phases: Vec<(SortPhase, u32)> = plan.rounds().iter().map(|r| (r.phase, r.step)).collect();
        assert_eq!(
            phases,
            vec![
                (SortPhase::Init, 1),
                (SortPhase::Swap, 2),
                (SortPhase::Swap, 1),
                (SortPhase::Merge, 4),
                (SortPhase::Merge, 2),
                (SortPhase::Merge, 1),
            ]
        );
    }

    #[test]
    fn init_round_matches_single_step_formula() {
        // set_step == step: sets of 4, left pair ascending, right pair mirrored
        let round = SortRound { phase: SortPhase::Init, step: 1, set_step: 1 };
        let pairs: Vec<(u32, u32)> = (0..4).map(|lane| round.lane_pair(4, lane)).collect();
        assert_eq!(pairs, vec![(0, 1), (3, 2), (4, 5), (7, 6)]);
    }

    #[test]
    fn tiny_inputs_have_no_rounds() {
        assert!(SortPlan::new(0).is_empty());
        assert!(SortPlan::new(1).is_empty());
        let two = SortPlan::new(2);
        assert_eq!(two.rounds(), &[SortRound { phase: SortPhase::Merge, step: 1, set_step: 1 }]);
    }

    #[test]
    fn only_first_round_carries_init_flag() {
        let plan = SortPlan::new(3);
        assert_eq!(plan.padded_count(), 4);
        assert_eq!(plan.metadata(0, SortAxis::X).init_flag, 1);
        for index in 1..plan.rounds().len() {
            assert_eq!(plan.metadata(index, SortAxis::X).init_flag, 0);
        }
    }

    #[test]
    fn metadata_is_push_constant_sized() {
        assert_eq!(size_of::<SortMetadata>(), 32);
    }
}
