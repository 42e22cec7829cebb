use glam::Vec3;

use crate::error::EngineError;
use crate::particles::particle_push_constants::FrameMetadata;
use crate::utils::bitonic_sort::SortOutcome;

/// Position of the scheduler inside one frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    SortClouds,
    UpdateClouds,
    UpdateParticles,
    Present,
}

impl FramePhase {
    pub fn next(self) -> Self {
        match self {
            FramePhase::Idle => FramePhase::SortClouds,
            FramePhase::SortClouds => FramePhase::UpdateClouds,
            FramePhase::UpdateClouds => FramePhase::UpdateParticles,
            FramePhase::UpdateParticles => FramePhase::Present,
            FramePhase::Present => FramePhase::Idle,
        }
    }
}

/// The work a scene performs in each phase.
///
/// Every method returns only once its dispatches have retired, which is
/// the barrier between two phases.
pub trait FrameStages {
    fn cloud_count(&self) -> u32;

    /// Particles the particle kernel runs over.
    fn active_particle_count(&self) -> u32;

    fn world_origin(&self) -> Vec3;

    fn sort_clouds(&mut self) -> Result<SortOutcome, EngineError>;

    fn update_clouds(&mut self, frame: &FrameMetadata) -> Result<(), EngineError>;

    fn update_particles(&mut self, frame: &FrameMetadata) -> Result<(), EngineError>;

    /// Copies the latest particle output into the presentation region.
    fn present(&mut self) -> Result<(), EngineError>;
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub delta_time: f32,
    pub sort: SortOutcome,
    /// False when the scene has no clouds and both cloud phases were skipped.
    pub clouds_updated: bool,
    pub active_particles: u32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    Presented(FrameReport),
    /// A shutdown was requested; no phase ran.
    Stopped,
}

/// Drives a scene through `IDLE → SORT_CLOUDS → UPDATE_CLOUDS →
/// UPDATE_PARTICLES → PRESENT → IDLE`, one frame per call.
pub struct FrameScheduler<S: FrameStages> {
    stages: S,
    phase: FramePhase,
    frame_index: u64,
    paused: bool,
    halted: bool,
    shutdown_requested: bool,
}

impl<S: FrameStages> FrameScheduler<S> {
    pub fn new(stages: S) -> Self {
        Self {
            stages,
            phase: FramePhase::Idle,
            frame_index: 0,
            paused: false,
            halted: false,
            shutdown_requested: false,
        }
    }

    pub fn stages(&self) -> &S {
        &self.stages
    }

    pub fn stages_mut(&mut self) -> &mut S {
        &mut self.stages
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// A paused scheduler still runs every phase but freezes the simulation.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Takes effect before the next frame; a running frame always completes.
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }

    /// Runs one whole frame. After a failure the scheduler stays halted and
    /// every later call returns [`EngineError::Halted`].
    pub fn run_frame(&mut self, delta_time: f32) -> Result<FrameOutcome, EngineError> {
        if self.halted {
            return Err(EngineError::Halted);
        }
        if self.shutdown_requested {
            log::info!("Shutdown requested, stopping after {} frames", self.frame_index);
            return Ok(FrameOutcome::Stopped);
        }

        let delta_time = if delta_time.is_finite() && delta_time >= 0.0 {
            delta_time
        } else {
            log::warn!("Ignoring invalid frame delta {delta_time}");
            0.0
        };

        match self.execute_frame(delta_time) {
            Ok(report) => {
                self.frame_index += 1;
                Ok(FrameOutcome::Presented(report))
            }
            Err(err) => {
                log::error!("Frame {} failed in {:?}: {err}", self.frame_index, self.phase);
                self.halted = true;
                self.phase = FramePhase::Idle;
                Err(err)
            }
        }
    }

    fn execute_frame(&mut self, delta_time: f32) -> Result<FrameReport, EngineError> {
        let world_origin = self.stages.world_origin();
        let active = !self.paused;

        self.enter(FramePhase::SortClouds);
        let cloud_count = self.stages.cloud_count();
        let sort = if cloud_count == 0 {
            SortOutcome::Empty
        } else {
            self.stages.sort_clouds()?
        };

        self.enter(FramePhase::UpdateClouds);
        let clouds_updated = cloud_count > 0;
        if clouds_updated {
            let frame = FrameMetadata::new(delta_time, cloud_count, world_origin, active);
            self.stages.update_clouds(&frame)?;
        } else {
            log::trace!("No clouds, skipping the cloud phases");
        }

        self.enter(FramePhase::UpdateParticles);
        let active_particles = self.stages.active_particle_count();
        let frame = FrameMetadata::new(delta_time, active_particles, world_origin, active);
        self.stages.update_particles(&frame)?;

        self.enter(FramePhase::Present);
        self.stages.present()?;

        self.enter(FramePhase::Idle);
        Ok(FrameReport {
            frame_index: self.frame_index,
            delta_time,
            sort,
            clouds_updated,
            active_particles,
        })
    }

    fn enter(&mut self, phase: FramePhase) {
        assert_eq!(self.phase.next(), phase, "frame phases must run in order");
        log::trace!("Frame {}: {:?} -> {:?}", self.frame_index, self.phase, phase);
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_form_a_cycle() {
        let mut phase = FramePhase::Idle;
        let mut visited = Vec::new();
        for _ in 0..5 {
            phase = phase.next();
            visited.push(phase);
        }
        assert_eq!(
            visited,
            vec![
                FramePhase::SortClouds,
                FramePhase::UpdateClouds,
                FramePhase::UpdateParticles,
                FramePhase::Present,
                FramePhase::Idle,
            ]
        );
    }
}
