use std::borrow::Cow;

use wgpu::{BindGroup, BindGroupLayout, PushConstantRange};
use wgpu_profiler::GpuProfiler;

use crate::config::{CLOUD_UPDATE_WORKGROUP_SIZE, PARTICLE_UPDATE_WORKGROUP_SIZE};
use crate::error::EngineError;
use crate::particles::particle::{Particle, ParticleCloud, PARTICLE_TYPES_WGSL};
use crate::particles::particle_push_constants::FrameMetadata;
use crate::utils::bind_resources::BindResources;
use crate::utils::compute_shader::ComputeShader;
use crate::utils::double_buffer::{DoubleBuffer, Side};
use crate::utils::gpu_buffer::GpuBuffer;
use crate::wgpu_context::WgpuContext;

const SIMULATION_TYPES_WGSL: &str = include_str!("simulation_types.wgsl");

pub type ParticleRegions = DoubleBuffer<GpuBuffer<Particle>>;
pub type CloudRegions = DoubleBuffer<GpuBuffer<ParticleCloud>>;

/// The two simulation kernels of the device substrate.
pub struct ParticleIntegration {
    particle_pass: ComputeShader,
    particle_bindings: BindResources,
    cloud_pass: ComputeShader,
    cloud_bindings: BindResources,
    /// Ping regions the bind groups were created for.
    bound_particles: wgpu::Buffer,
    bound_clouds: wgpu::Buffer,
}

impl ParticleIntegration {
    pub fn new(wgpu_context: &WgpuContext, particles: &ParticleRegions, clouds: &CloudRegions) -> Self {
        let particle_layout = Self::create_bind_group_layout(wgpu_context, "particle update bind group layout", 1);
        let particle_groups = [Side::Ping, Side::Pong]
            .into_iter()
            .map(|side| {
                Self::create_bind_group(
                    wgpu_context,
                    &particle_layout,
                    &[particles.region(side).buffer()],
                    &[particles.region(side.flipped()).buffer()],
                )
            })
            .collect();
        let particle_bindings = BindResources::new(particle_layout, particle_groups);

        // Bit 0 of the group index is the cloud side, bit 1 the particle side
        let cloud_layout = Self::create_bind_group_layout(wgpu_context, "cloud update bind group layout", 2);
        let mut cloud_groups = Vec::with_capacity(4);
        for particle_side in [Side::Ping, Side::Pong] {
            for cloud_side in [Side::Ping, Side::Pong] {
                cloud_groups.push(Self::create_bind_group(
                    wgpu_context,
                    &cloud_layout,
                    &[clouds.region(cloud_side).buffer(), particles.region(particle_side).buffer()],
                    &[
                        clouds.region(cloud_side.flipped()).buffer(),
                        particles.region(particle_side.flipped()).buffer(),
                    ],
                ));
            }
        }
        let cloud_bindings = BindResources::new(cloud_layout, cloud_groups);

        let particle_pass = Self::create_pass(
            wgpu_context,
            include_str!("particle_update.wgsl"),
            "update_particles",
            &particle_bindings.bind_group_layout,
            PARTICLE_UPDATE_WORKGROUP_SIZE,
        );
        let cloud_pass = Self::create_pass(
            wgpu_context,
            include_str!("cloud_update.wgsl"),
            "update_clouds",
            &cloud_bindings.bind_group_layout,
            CLOUD_UPDATE_WORKGROUP_SIZE,
        );

        Self {
            particle_pass,
            particle_bindings,
            cloud_pass,
            cloud_bindings,
            bound_particles: particles.region(Side::Ping).buffer().clone(),
            bound_clouds: clouds.region(Side::Ping).buffer().clone(),
        }
    }

    fn create_pass(
        wgpu_context: &WgpuContext,
        kernel_source: &str,
        entry_point: &str,
        bind_group_layout: &BindGroupLayout,
        workgroup_size: (u32, u32, u32),
    ) -> ComputeShader {
        let source = format!("{PARTICLE_TYPES_WGSL}\n{SIMULATION_TYPES_WGSL}\n{kernel_source}");
        ComputeShader::new(
            wgpu_context,
            wgpu::ShaderModuleDescriptor {
                label: Some(entry_point),
                source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
            },
            entry_point,
            bind_group_layout,
            workgroup_size,
            &[("WORKGROUP_SIZE", workgroup_size.0 as f64)],
            &[PushConstantRange {
                stages: wgpu::ShaderStages::COMPUTE,
                range: 0..size_of::<FrameMetadata>() as u32,
            }],
        )
    }

    /// Records the particle kernel over `frame.active_count` particles and swaps the particle buffer.
    pub fn update_particles(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        gpu_profiler: &mut GpuProfiler,
        particles: &mut ParticleRegions,
        frame: &FrameMetadata,
    ) -> Result<(), EngineError> {
        assert!(particles.region(Side::Ping).buffer() == &self.bound_particles, "kernels were built for other particles");
        {
            let mut scope = gpu_profiler.scope("Particle update pass", encoder);
            self.particle_pass.dispatch_by_items(
                &mut scope,
                frame.active_count,
                Some(vec![(0, bytemuck::bytes_of(frame))]),
                self.particle_bindings.bind_group(&[particles.side()]),
            )?;
        }
        particles.swap();
        Ok(())
    }

    /// Records the cloud kernel over `frame.active_count` clouds and swaps both buffers.
    pub fn update_clouds(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        gpu_profiler: &mut GpuProfiler,
        clouds: &mut CloudRegions,
        particles: &mut ParticleRegions,
        frame: &FrameMetadata,
    ) -> Result<(), EngineError> {
        assert!(particles.region(Side::Ping).buffer() == &self.bound_particles, "kernels were built for other particles");
        assert!(clouds.region(Side::Ping).buffer() == &self.bound_clouds, "kernels were built for other clouds");
        {
            let mut scope = gpu_profiler.scope("Cloud update pass", encoder);
            self.cloud_pass.dispatch_by_items(
                &mut scope,
                frame.active_count,
                Some(vec![(0, bytemuck::bytes_of(frame))]),
                self.cloud_bindings.bind_group(&[clouds.side(), particles.side()]),
            )?;
        }
        clouds.swap();
        particles.swap();
        Ok(())
    }

    /// Sources occupy the first bindings, targets follow.
    fn create_bind_group(
        wgpu_context: &WgpuContext,
        bind_group_layout: &BindGroupLayout,
        sources: &[&wgpu::Buffer],
        targets: &[&wgpu::Buffer],
    ) -> BindGroup {
        let entries: Vec<wgpu::BindGroupEntry> = sources
            .iter()
            .chain(targets)
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        wgpu_context.get_device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: bind_group_layout,
            entries: &entries,
        })
    }

    fn create_bind_group_layout(wgpu_context: &WgpuContext, label: &str, buffers: u32) -> BindGroupLayout {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..2 * buffers)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    // Sources are read only, targets read-write
                    ty: wgpu::BufferBindingType::Storage { read_only: binding < buffers },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        wgpu_context.get_device().create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &entries,
        })
    }
}
