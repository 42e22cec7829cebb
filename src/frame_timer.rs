use std::time::{Duration, Instant};

/// Longest step handed to the simulation.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// Wall-clock delta between two frames, clamped to a maximum.
pub struct FrameTimer {
    last_frame: Instant,
    max_delta: Duration,
}

impl FrameTimer {
    pub fn new(max_delta: Duration) -> Self {
        Self {
            last_frame: Instant::now(),
            max_delta,
        }
    }

    /// Seconds since the previous call (or since creation).
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame);
        self.last_frame = now;
        if delta > self.max_delta {
            log::debug!("Clamping frame delta of {delta:?}");
        }
        delta.min(self.max_delta).as_secs_f32()
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(MAX_FRAME_DELTA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_never_exceeds_the_clamp() {
        let mut timer = FrameTimer::new(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(timer.tick(), 0.0);
    }
}
