use wgpu::{BindGroup, CommandEncoder, PushConstantRange};

use crate::error::EngineError;
use crate::utils::dispatch_grid;
use crate::wgpu_context::WgpuContext;

pub struct ComputeShader {
    pipeline: wgpu::ComputePipeline,
    entry_point: String,
    workgroup_size: (u32, u32, u32),
}

impl ComputeShader {
    pub fn new(
        wgpu_context: &WgpuContext,
        shader_file: wgpu::ShaderModuleDescriptor,
        entry_point: &str,
        bind_group_layout: &wgpu::BindGroupLayout,
        workgroup_size: (u32, u32, u32),
        constants: &[(&str, f64)],
        push_constants: &[PushConstantRange],
    ) -> Self {
        let device = wgpu_context.get_device();
        let compute_shader = device.create_shader_module(shader_file);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("Compute Pipeline Layout for {}", entry_point)),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: push_constants,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("Compute Pipeline for {}", entry_point)),
            layout: Some(&pipeline_layout),
            module: &compute_shader,
            entry_point: Some(entry_point),
            compilation_options: wgpu::PipelineCompilationOptions {
                constants,
                zero_initialize_workgroup_memory: true,
            },
            cache: None,
        });

        Self {
            pipeline,
            entry_point: entry_point.to_string(),
            workgroup_size,
        }
    }

    /// Dispatches the compute shader in its own compute pass.
    ///
    /// Successive passes of one encoder execute in order, which makes every
    /// call a full barrier for the storage it writes.
    pub fn dispatch(
        &self,
        encoder: &mut CommandEncoder,
        dispatch_size: (u32, u32, u32),
        push_constants_data: Option<Vec<(u32, &[u8])>>,
        bind_group: &BindGroup,
    ) {
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(&self.entry_point),
            timestamp_writes: None,
        });

        compute_pass.set_pipeline(&self.pipeline);

        if let Some(constants) = push_constants_data {
            for (offset, data) in constants {
                compute_pass.set_push_constants(offset, data);
            }
        }

        compute_pass.set_bind_group(0, bind_group, &[]);
        compute_pass.dispatch_workgroups(dispatch_size.0, dispatch_size.1, dispatch_size.2);
    }

    /// Dispatches enough groups to run `item_count` lanes along x.
    pub fn dispatch_by_items(
        &self,
        encoder: &mut CommandEncoder,
        item_count: u32,
        push_constants_data: Option<Vec<(u32, &[u8])>>,
        bind_group: &BindGroup,
    ) -> Result<(), EngineError> {
        let groups = dispatch_grid::checked_group_count(item_count, self.workgroup_size.0)?;
        if groups == 0 {
            return Ok(());
        }
        self.dispatch(encoder, (groups, 1, 1), push_constants_data, bind_group);
        Ok(())
    }
}
