use std::panic::AssertUnwindSafe;

use glam::{Vec2, Vec3};
use particle_engine::config::{SceneConfig, SortAxis};
use particle_engine::frame_scheduler::FrameScheduler;
use particle_engine::particles::particle::{Particle, ParticleCloud};
use particle_engine::scene::cpu_scene::CpuScene;
use particle_engine::scene::gpu_scene::GpuScene;
use particle_engine::utils::bitonic_sort::gpu_sorter::GpuBitonicSorter;
use particle_engine::utils::bitonic_sort::{SortElement, SortOutcome};
use particle_engine::utils::dispatch_grid::ceil_pow2;
use particle_engine::utils::double_buffer::DoubleBuffer;
use wgpu_profiler::{GpuProfiler, GpuProfilerSettings};

mod common;

const TOLERANCE: f32 = 1e-4;

#[test]
fn device_sort_matches_host_sort() {
    let Some(setup) = pollster::block_on(common::setup()) else { return };
    let wgpu_context = &setup.wgpu_context;
    let mut gpu_profiler = GpuProfiler::new(wgpu_context.get_device(), GpuProfilerSettings::default()).unwrap();

    for (seed, len) in [(1u64, 3usize), (2, 8), (3, 17), (4, 1000), (5, 4096)] {
        let keys = common::random_keys(seed, len, 10_000);
        let mut buffer = DoubleBuffer::create_on_device(wgpu_context, "Sort keys", ceil_pow2(len as u32), Some(keys.as_slice())).unwrap();
        let sorter = GpuBitonicSorter::new(wgpu_context, &buffer, SortAxis::X);

        let mut encoder = wgpu_context.get_device().create_command_encoder(
            &wgpu::CommandEncoderDescriptor { label: Some("Bitonic sort test Encoder") }
        );
        let outcome = sorter.sort(&mut encoder, &mut gpu_profiler, &mut buffer, len as u32).unwrap();
        gpu_profiler.resolve_queries(&mut encoder);
        wgpu_context.submit_and_wait(encoder).unwrap();
        gpu_profiler.end_frame().unwrap();

        let region = buffer.download_source(wgpu_context).unwrap();
        assert_eq!(&region[..len], common::std_sorted(&keys).as_slice(), "length {len}");
        assert!(region[len..].iter().all(|&key| key == u32::MAX));
        assert_eq!(outcome.rounds(), common::sort_on_host(&keys, SortAxis::X).unwrap().1.rounds());
    }
}

#[test]
fn device_particle_sort_matches_host_sort() {
    let Some(setup) = pollster::block_on(common::setup()) else { return };
    let wgpu_context = &setup.wgpu_context;
    let mut gpu_profiler = GpuProfiler::new(wgpu_context.get_device(), GpuProfilerSettings::default()).unwrap();

    // Distinct finite depths, one of them equal to the padding position
    let depths = [4.0f32, f32::MAX, -2.5, 0.0, 9.0, -7.0, 1.5, 3.0, -f32::MAX, 6.0, 2.0];
    let particles: Vec<Particle> = depths
        .iter()
        .enumerate()
        .map(|(index, &z)| Particle::new(Vec3::new(index as f32, 0.0, z), Vec3::ZERO, Vec3::ONE, Vec2::ONE, 1.0 + index as f32))
        .collect();
    let len = particles.len();

    let mut buffer = DoubleBuffer::create_on_device(wgpu_context, "Sort particles", ceil_pow2(len as u32), Some(particles.as_slice())).unwrap();
    let sorter = GpuBitonicSorter::new(wgpu_context, &buffer, SortAxis::Z);
    let mut encoder = wgpu_context.get_device().create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    sorter.sort(&mut encoder, &mut gpu_profiler, &mut buffer, len as u32).unwrap();
    gpu_profiler.resolve_queries(&mut encoder);
    wgpu_context.submit_and_wait(encoder).unwrap();
    gpu_profiler.end_frame().unwrap();

    let region = buffer.download_source(wgpu_context).unwrap();
    let (host, _) = common::sort_on_host(&particles, SortAxis::Z).unwrap();
    assert_eq!(&region[..len], &host[..len]);
    assert!(region[..len].iter().all(|particle| !particle.is_phantom()));
    assert!(region[len..].iter().all(Particle::is_phantom));
}

#[test]
fn device_sorter_refuses_a_foreign_buffer() {
    let Some(setup) = pollster::block_on(common::setup()) else { return };
    let wgpu_context = &setup.wgpu_context;
    let mut gpu_profiler = GpuProfiler::new(wgpu_context.get_device(), GpuProfilerSettings::default()).unwrap();
    let keys = [4u32, 3, 2, 1];
    let bound = DoubleBuffer::create_on_device(wgpu_context, "Bound keys", 4, Some(keys.as_slice())).unwrap();
    let mut other = DoubleBuffer::create_on_device(wgpu_context, "Other keys", 4, Some(keys.as_slice())).unwrap();
    let sorter = GpuBitonicSorter::new(wgpu_context, &bound, SortAxis::X);

    let mut encoder = wgpu_context.get_device().create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        sorter.sort(&mut encoder, &mut gpu_profiler, &mut other, 4)
    }));
    assert!(result.is_err());
    assert_eq!(other.side(), bound.side());
}

#[test]
fn device_sort_skips_tiny_inputs() {
    let Some(setup) = pollster::block_on(common::setup()) else { return };
    let wgpu_context = &setup.wgpu_context;
    let mut gpu_profiler = GpuProfiler::new(wgpu_context.get_device(), GpuProfilerSettings::default()).unwrap();
    let mut buffer = DoubleBuffer::create_on_device(wgpu_context, "Single key", 1, Some(&[7u32])).unwrap();
    let sorter = GpuBitonicSorter::new(wgpu_context, &buffer, SortAxis::X);

    let mut encoder = wgpu_context.get_device().create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    assert_eq!(sorter.sort(&mut encoder, &mut gpu_profiler, &mut buffer, 1).unwrap(), SortOutcome::Trivial);
    assert_eq!(sorter.sort(&mut encoder, &mut gpu_profiler, &mut buffer, 0).unwrap(), SortOutcome::Empty);
    wgpu_context.submit_and_wait(encoder).unwrap();
    assert_eq!(buffer.download_source(wgpu_context).unwrap(), vec![7]);
}

fn assert_particles_close(device: &[Particle], host: &[Particle]) {
    assert_eq!(device.len(), host.len());
    for (index, (a, b)) in device.iter().zip(host).enumerate() {
        assert!((a.position - b.position).length() < TOLERANCE, "particle {index}: {a:?} vs {b:?}");
        assert_eq!(a.is_active(), b.is_active(), "particle {index}");
    }
}

fn assert_clouds_close(device: &[ParticleCloud], host: &[ParticleCloud]) {
    assert_eq!(device.len(), host.len());
    for (a, b) in device.iter().zip(host) {
        assert!((a.position - b.position).length() < TOLERANCE, "{a:?} vs {b:?}");
        assert_eq!(a.particle_start, b.particle_start);
        assert_eq!(a.active_count, b.active_count);
    }
}

#[test]
fn device_and_host_scenes_agree() {
    for config in [SceneConfig::flat(100), SceneConfig::clouds(300, 8)] {
        let Some(setup) = pollster::block_on(common::setup()) else { return };
        let mut device = FrameScheduler::new(GpuScene::new(setup.wgpu_context, &config).unwrap());
        let mut host = FrameScheduler::new(CpuScene::new(&config).unwrap());

        for _ in 0..12 {
            device.run_frame(0.1).unwrap();
            host.run_frame(0.1).unwrap();
        }

        let device_particles = device.stages_mut().download_presented_particles().unwrap();
        assert_particles_close(&device_particles, host.stages().presented_particles());
        let device_clouds = device.stages_mut().download_clouds().unwrap();
        assert_clouds_close(&device_clouds, host.stages().clouds());
    }
}
