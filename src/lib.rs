pub mod config;
pub mod error;
pub mod frame_scheduler;
pub mod frame_timer;
pub mod particles;
pub mod scene;
pub mod utils;
pub mod wgpu_context;

use config::SceneConfig;
use frame_scheduler::{FrameOutcome, FrameScheduler, FrameStages};
use frame_timer::FrameTimer;
use scene::cpu_scene::CpuScene;
use scene::gpu_scene::GpuScene;
use wgpu_context::WgpuContext;

/// Frames simulated by the headless demo.
const DEMO_FRAMES: u64 = 600;

/// Frames between two progress reports.
const REPORT_INTERVAL: u64 = 100;

pub fn run() -> anyhow::Result<()> {
    env_logger::init();

    let config = SceneConfig::default();
    match pollster::block_on(WgpuContext::new()) {
        Ok(wgpu_context) => {
            let scene = GpuScene::new(wgpu_context, &config)?;
            run_frames(FrameScheduler::new(scene))
        }
        Err(err) => {
            log::warn!("No usable GPU ({err}), simulating on the CPU");
            let scene = CpuScene::new(&config)?;
            run_frames(FrameScheduler::new(scene))
        }
    }
}

fn run_frames<S: FrameStages>(mut scheduler: FrameScheduler<S>) -> anyhow::Result<()> {
    let mut frame_timer = FrameTimer::default();
    loop {
        if scheduler.frame_index() == DEMO_FRAMES {
            scheduler.request_shutdown();
        }

        match scheduler.run_frame(frame_timer.tick())? {
            FrameOutcome::Presented(report) => {
                if report.frame_index % REPORT_INTERVAL == 0 {
                    log::info!(
                        "Frame {}: dt {:.2} ms, {} sort rounds, {} particles",
                        report.frame_index,
                        report.delta_time * 1000.0,
                        report.sort.rounds(),
                        report.active_particles
                    );
                }
            }
            FrameOutcome::Stopped => return Ok(()),
        }
    }
}
