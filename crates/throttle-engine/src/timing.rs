//! Frame pacing for the host loop.
//!
//! The simulation always advances in fixed steps; the host either feeds it
//! measured wall-clock deltas (realtime) or exactly one step per frame
//! (headless).

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Upper bound on fixed steps taken for a single frame.
const MAX_STEPS_PER_FRAME: u32 = 8;

/// Number of frame deltas kept for the rolling average.
const SAMPLE_WINDOW: usize = 120;

/// Fixed timestep accumulator with frame-rate limiting.
#[derive(Debug)]
pub struct FrameTiming {
    /// Target frames per second
    target_fps: u32,
    /// Time budget per frame
    frame_budget: Duration,
    /// Start of the current frame
    frame_start: Instant,
    /// Unsimulated time carried between frames
    accumulator: f32,
    /// Simulation step length
    fixed_dt: f32,
    /// Largest delta accepted from one frame
    max_dt: f32,
    /// Recent frame deltas
    samples: VecDeque<f32>,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FrameTiming {
    /// Creates a timer stepping the simulation at `target_fps`.
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        let target_fps = target_fps.max(1);
        Self {
            target_fps,
            frame_budget: Duration::from_secs_f64(1.0 / f64::from(target_fps)),
            frame_start: Instant::now(),
            accumulator: 0.0,
            fixed_dt: 1.0 / target_fps as f32,
            max_dt: 0.25,
            samples: VecDeque::with_capacity(SAMPLE_WINDOW),
        }
    }

    /// Sets the largest frame delta accepted before clamping.
    #[must_use]
    pub fn with_max_dt(mut self, max_dt: f32) -> Self {
        self.max_dt = max_dt.max(self.fixed_dt);
        self
    }

    /// Simulation step length in seconds.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Largest accepted frame delta.
    #[must_use]
    pub fn max_dt(&self) -> f32 {
        self.max_dt
    }

    /// Target frames per second.
    #[must_use]
    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Measures the wall-clock time since the previous call and starts a new frame.
    pub fn delta_time(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.frame_start).as_secs_f32();
        self.frame_start = now;
        self.record(dt)
    }

    /// Records a frame delta, clamped to `max_dt`, and returns the clamped value.
    pub fn record(&mut self, dt: f32) -> f32 {
        let dt = if dt.is_finite() { dt.clamp(0.0, self.max_dt) } else { 0.0 };
        if self.samples.len() == SAMPLE_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(dt);
        dt
    }

    /// Adds `dt` to the accumulator and returns how many fixed steps are due.
    ///
    /// If the backlog exceeds [`MAX_STEPS_PER_FRAME`] steps the excess is dropped.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut steps = 0;
        while self.accumulator >= self.fixed_dt && steps < MAX_STEPS_PER_FRAME {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }
        if self.accumulator >= self.fixed_dt {
            self.accumulator = 0.0;
        }
        steps
    }

    /// Fraction of a step left in the accumulator, for interpolation.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.fixed_dt
    }

    /// Sleeps until the current frame's budget is used up.
    pub fn sleep_remainder(&self) {
        let elapsed = self.frame_start.elapsed();
        if let Some(remaining) = self.frame_budget.checked_sub(elapsed) {
            std::thread::sleep(remaining);
        }
    }

    /// Average frames per second over recent frames.
    #[must_use]
    pub fn current_fps(&self) -> f32 {
        let average = self.average_dt();
        if average > 0.0 {
            1.0 / average
        } else {
            0.0
        }
    }

    /// Average frame time in milliseconds.
    #[must_use]
    pub fn average_frame_time_ms(&self) -> f32 {
        self.average_dt() * 1000.0
    }

    /// Clears the accumulator and samples, e.g. after a restart.
    pub fn reset(&mut self) {
        self.frame_start = Instant::now();
        self.accumulator = 0.0;
        self.samples.clear();
    }

    fn average_dt(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_dt_follows_target_fps() {
        let timing = FrameTiming::new(50);
        assert_eq!(timing.target_fps(), 50);
        assert!((timing.fixed_dt() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_one_step_per_fixed_frame() {
        let mut timing = FrameTiming::new(60);
        let dt = timing.fixed_dt();
        for _ in 0..100 {
            assert_eq!(timing.accumulate(dt), 1);
        }
    }

    #[test]
    fn test_half_frames_alternate() {
        let mut timing = FrameTiming::new(60);
        let half = timing.fixed_dt() * 0.5;
        assert_eq!(timing.accumulate(half), 0);
        assert!((timing.alpha() - 0.5).abs() < 1e-4);
        assert_eq!(timing.accumulate(half * 1.01), 1);
    }

    #[test]
    fn test_backlog_is_capped() {
        let mut timing = FrameTiming::new(60);
        assert_eq!(timing.accumulate(10.0), MAX_STEPS_PER_FRAME);
        assert_eq!(timing.alpha(), 0.0);
    }

    #[test]
    fn test_record_clamps_delta() {
        let mut timing = FrameTiming::new(60).with_max_dt(0.25);
        assert_eq!(timing.record(1.0), 0.25);
        assert_eq!(timing.record(f32::NAN), 0.0);
        assert_eq!(timing.record(-1.0), 0.0);
    }

    #[test]
    fn test_average_fps() {
        let mut timing = FrameTiming::new(60);
        assert_eq!(timing.current_fps(), 0.0);
        for _ in 0..10 {
            timing.record(0.02);
        }
        assert!((timing.current_fps() - 50.0).abs() < 0.01);
        assert!((timing.average_frame_time_ms() - 20.0).abs() < 0.01);

        timing.reset();
        assert_eq!(timing.current_fps(), 0.0);
    }

    #[test]
    fn test_measured_delta() {
        let mut timing = FrameTiming::new(60);
        std::thread::sleep(Duration::from_millis(5));
        let dt = timing.delta_time();
        assert!(dt > 0.0);
        assert!(dt <= timing.max_dt());
    }
}
