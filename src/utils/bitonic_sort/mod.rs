use crate::config::SortAxis;

pub mod network;
pub mod cpu_sorter;
pub mod gpu_sorter;

/// An element the bitonic network can order.
pub trait SortElement: Copy + Send + Sync {
    type Key: PartialOrd + Copy;

    fn sort_key(&self, axis: SortAxis) -> Self::Key;

    /// Value written into padded slots.
    ///
    /// Records mark it through [`SortElement::is_phantom`]. Scalars without a
    /// marker use the greatest value of their type, so a tie with a real
    /// element leaves identical bits in both slots.
    fn sentinel() -> Self;

    fn is_phantom(&self) -> bool {
        false
    }

    /// Strict order of the network: phantoms follow every real element
    /// whatever their keys, real elements compare by key.
    fn sorts_before(&self, other: &Self, axis: SortAxis) -> bool {
        match (self.is_phantom(), other.is_phantom()) {
            (false, false) => self.sort_key(axis) < other.sort_key(axis),
            (is_phantom, other_is_phantom) => !is_phantom && other_is_phantom,
        }
    }
}

/// What a sort call did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SortOutcome {
    /// Nothing to sort; no round was dispatched.
    Empty,
    /// A single element is sorted by definition; no round was dispatched.
    Trivial,
    Sorted { rounds: u32 },
}

impl SortOutcome {
    pub fn rounds(&self) -> u32 {
        match self {
            SortOutcome::Sorted { rounds } => *rounds,
            _ => 0,
        }
    }
}

pub(crate) fn skipped_outcome(element_count: u32) -> Option<SortOutcome> {
    match element_count {
        0 => Some(SortOutcome::Empty),
        1 => Some(SortOutcome::Trivial),
        _ => None,
    }
}

impl SortElement for u32 {
    type Key = u32;

    fn sort_key(&self, _axis: SortAxis) -> u32 {
        *self
    }

    fn sentinel() -> Self {
        u32::MAX
    }
}

impl SortElement for i32 {
    type Key = i32;

    fn sort_key(&self, _axis: SortAxis) -> i32 {
        *self
    }

    fn sentinel() -> Self {
        i32::MAX
    }
}

/// Greatest value in the IEEE 754 total order: a positive NaN with every
/// payload bit set.
pub const F32_SENTINEL_BITS: u32 = 0x7fff_ffff;

/// Floats follow [`f32::total_cmp`], so infinities and NaNs sort too.
impl SortElement for f32 {
    type Key = f32;

    fn sort_key(&self, _axis: SortAxis) -> f32 {
        *self
    }

    fn sentinel() -> Self {
        f32::from_bits(F32_SENTINEL_BITS)
    }

    fn sorts_before(&self, other: &Self, _axis: SortAxis) -> bool {
        self.total_cmp(other).is_lt()
    }
}
