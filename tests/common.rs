// Not every test file will use every function.
#![allow(dead_code)]

use particle_engine::config::SortAxis;
use particle_engine::error::EngineError;
use particle_engine::utils::bitonic_sort::cpu_sorter::CpuBitonicSorter;
use particle_engine::utils::bitonic_sort::{SortElement, SortOutcome};
use particle_engine::utils::dispatch_grid::ceil_pow2;
use particle_engine::utils::double_buffer::DoubleBuffer;
use particle_engine::wgpu_context::WgpuContext;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// A struct to hold all the common objects for a GPU test.
pub struct TestSetup {
    pub wgpu_context: WgpuContext,
}

/// Headless device setup; `None` when the machine has no usable adapter.
pub async fn setup() -> Option<TestSetup> {
    match WgpuContext::new_for_test().await {
        Ok(wgpu_context) => Some(TestSetup { wgpu_context }),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}

/// Buffer sized for the padded sort domain of `values`.
pub fn sort_buffer<T: SortElement + Default>(values: &[T]) -> DoubleBuffer<Vec<T>> {
    let capacity = ceil_pow2(values.len().max(1) as u32);
    DoubleBuffer::create(capacity, Some(values)).unwrap()
}

/// Sorts `values` on the host and returns the whole source region.
pub fn sort_on_host<T: SortElement + Default>(values: &[T], axis: SortAxis) -> Result<(Vec<T>, SortOutcome), EngineError> {
    let mut buffer = sort_buffer(values);
    let outcome = CpuBitonicSorter::new(axis).sort(&mut buffer, values.len() as u32)?;
    Ok((buffer.source().clone(), outcome))
}

/// Sorted prefix of a host sort.
pub fn sorted_on_host<T: SortElement + Default>(values: &[T]) -> Vec<T> {
    let (region, _) = sort_on_host(values, SortAxis::default()).unwrap();
    region[..values.len()].to_vec()
}

pub fn random_keys(seed: u64, len: usize, max: u32) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.random_range(0..max)).collect()
}

pub fn std_sorted<T: Ord + Clone>(values: &[T]) -> Vec<T> {
    let mut sorted = values.to_vec();
    sorted.sort();
    sorted
}
