use std::borrow::Cow;
use std::marker::PhantomData;

use bytemuck::bytes_of;
use wgpu::{BindGroupLayout, PushConstantRange};
use wgpu_profiler::GpuProfiler;

use crate::config::{SortAxis, SORT_WORKGROUP_SIZE};
use crate::error::EngineError;
use crate::utils::bind_resources::BindResources;
use crate::utils::bitonic_sort::network::{SortMetadata, SortPhase, SortPlan};
use crate::utils::bitonic_sort::{skipped_outcome, SortElement, SortOutcome};
use crate::utils::compute_shader::ComputeShader;
use crate::utils::dispatch_grid;
use crate::utils::double_buffer::{DoubleBuffer, Side};
use crate::utils::gpu_buffer::GpuBuffer;
use crate::wgpu_context::WgpuContext;

const BITONIC_SORT_WGSL: &str = include_str!("bitonic_sort.wgsl");

/// An element whose storage layout and ordering are also expressed in WGSL.
pub trait GpuSortElement: SortElement + bytemuck::Pod {
    /// WGSL declaring `alias Element`, `element_less(a, b, axis)` and
    /// `sentinel_element()`, plus any struct they need.
    fn wgsl_element() -> Cow<'static, str>;
}

impl GpuSortElement for u32 {
    fn wgsl_element() -> Cow<'static, str> {
        Cow::Borrowed(
            "alias Element = u32;\n\
             fn element_less(a: Element, b: Element, axis: u32) -> bool { return a < b; }\n\
             fn sentinel_element() -> Element { return 0xffffffffu; }\n",
        )
    }
}

/// Runs the bitonic network on the device, one compute pass per round.
///
/// Bind groups are created for one specific double buffer; sorting another
/// buffer needs another sorter.
pub struct GpuBitonicSorter<T> {
    init_pass: ComputeShader,
    swap_pass: ComputeShader,
    merge_pass: ComputeShader,
    bind_resources: BindResources,
    /// Ping region of the buffer the bind groups point at.
    bound_region: wgpu::Buffer,
    axis: SortAxis,
    _element: PhantomData<T>,
}

impl<T: GpuSortElement> GpuBitonicSorter<T> {
    pub fn new(wgpu_context: &WgpuContext, buffer: &DoubleBuffer<GpuBuffer<T>>, axis: SortAxis) -> Self {
        let bind_group_layout = Self::create_bind_group_layout(wgpu_context);
        let bind_groups = [Side::Ping, Side::Pong]
            .into_iter()
            .map(|side| Self::create_bind_group(wgpu_context, &bind_group_layout, buffer, side))
            .collect();
        let bind_resources = BindResources::new(bind_group_layout, bind_groups);

        let source = format!("{}\n{}", T::wgsl_element(), BITONIC_SORT_WGSL);
        let create_pass = |phase: SortPhase| {
            ComputeShader::new(
                wgpu_context,
                wgpu::ShaderModuleDescriptor {
                    label: Some("bitonic_sort.wgsl"),
                    source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&source)),
                },
                phase.entry_point(),
                &bind_resources.bind_group_layout,
                SORT_WORKGROUP_SIZE,
                &[("WORKGROUP_SIZE", SORT_WORKGROUP_SIZE.0 as f64)],
                &[PushConstantRange {
                    stages: wgpu::ShaderStages::COMPUTE,
                    range: 0..size_of::<SortMetadata>() as u32,
                }],
            )
        };

        Self {
            init_pass: create_pass(SortPhase::Init),
            swap_pass: create_pass(SortPhase::Swap),
            merge_pass: create_pass(SortPhase::Merge),
            bind_resources,
            bound_region: buffer.region(Side::Ping).buffer().clone(),
            axis,
            _element: PhantomData,
        }
    }

    /// Records every round of the network into `encoder`.
    ///
    /// The side bit of `buffer` is flipped once per recorded round, so once
    /// the encoder has been submitted and retired `buffer.source()` holds the
    /// sorted prefix followed by sentinels.
    pub fn sort(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        gpu_profiler: &mut GpuProfiler,
        buffer: &mut DoubleBuffer<GpuBuffer<T>>,
        element_count: u32,
    ) -> Result<SortOutcome, EngineError> {
        assert!(
            buffer.region(Side::Ping).buffer() == &self.bound_region,
            "sorter was built for another buffer"
        );
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

        let groups = dispatch_grid::checked_group_count(plan.thread_count(), SORT_WORKGROUP_SIZE.0)?;
        log::debug!(
            "Bitonic sort of {} elements on the device: {} rounds, {} groups per round",
            element_count,
            plan.rounds().len(),
            groups
        );

        {
            let mut scope = gpu_profiler.scope("Bitonic sort", encoder);
            for (index, round) in plan.rounds().iter().enumerate() {
                let metadata = plan.metadata(index, self.axis);
                let pass = match round.phase {
                    SortPhase::Init => &self.init_pass,
                    SortPhase::Swap => &self.swap_pass,
                    SortPhase::Merge => &self.merge_pass,
                };
                pass.dispatch(
                    &mut scope,
                    (groups, 1, 1),
                    Some(vec![(0, bytes_of(&metadata))]),
                    self.bind_resources.bind_group(&[buffer.side()]),
                );
                buffer.swap();
            }
        }

        Ok(SortOutcome::Sorted { rounds: plan.rounds().len() as u32 })
    }

    fn create_bind_group(
        wgpu_context: &WgpuContext,
        bind_group_layout: &BindGroupLayout,
        buffer: &DoubleBuffer<GpuBuffer<T>>,
        side: Side,
    ) -> wgpu::BindGroup {
        wgpu_context.get_device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bitonic sort bind group"),
            layout: bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.region(side).buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffer.region(side.flipped()).buffer().as_entire_binding(),
                },
            ],
        })
    }

    fn create_bind_group_layout(wgpu_context: &WgpuContext) -> BindGroupLayout {
        wgpu_context.get_device().create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bitonic sort bind group layout"),
            entries: &[
                // Source region
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Target region
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        })
    }
}
