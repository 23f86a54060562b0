//! Frame clocks: simulated (scaled, pausable) and real time

use std::time::Instant;

/// Source of per-frame elapsed time.
///
/// Every scheduler and particle update takes a `&dyn Clock` instead of
/// reading a global, so tests can drive time with synthetic steps.
pub trait Clock {
    /// Simulated seconds elapsed this frame (scaled, zero while paused)
    fn delta_time(&self) -> f32;

    /// Wall-clock seconds elapsed this frame, unaffected by scale or pause
    fn real_delta_time(&self) -> f32;
}

/// Wall-clock driven game clock with time scale and pause
pub struct GameClock {
    /// Total simulated time in seconds
    pub total_time: f64,
    /// Total real time in seconds
    pub real_total_time: f64,
    /// Multiplier applied to real time to obtain simulated time
    pub time_scale: f64,
    /// Upper bound on a single frame's real delta
    pub max_frame_time: f64,
    paused: bool,
    raw_delta: f64,
    last_instant: Instant,
    first_tick: bool,
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            total_time: 0.0,
            real_total_time: 0.0,
            time_scale: 1.0,
            max_frame_time: 0.25,
            paused: false,
            raw_delta: 0.0,
            last_instant: Instant::now(),
            first_tick: true,
        }
    }
}

impl GameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock from the wall clock. Call once per frame.
    pub fn tick(&mut self) {
        let now = Instant::now();

        if self.first_tick {
            self.first_tick = false;
            self.last_instant = now;
            self.raw_delta = 0.0;
            return;
        }

        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(elapsed);
    }

    /// Advance the clock by an explicit real-time step.
    pub fn advance(&mut self, real_seconds: f64) {
        // Clamp to avoid spiral of death
        self.raw_delta = real_seconds.clamp(0.0, self.max_frame_time);
        self.real_total_time += self.raw_delta;

        self.total_time += self.scaled_delta();
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn scaled_delta(&self) -> f64 {
        if self.paused {
            0.0
        } else {
            self.raw_delta * self.time_scale.max(0.0)
        }
    }
}

impl Clock for GameClock {
    fn delta_time(&self) -> f32 {
        self.scaled_delta() as f32
    }

    fn real_delta_time(&self) -> f32 {
        self.raw_delta as f32
    }
}

/// A clock advanced by hand, one synthetic step at a time.
///
/// Used by headless simulation and tests where frame timing must be exact.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepClock {
    pub delta: f32,
    pub real_delta: f32,
}

impl StepClock {
    /// Simulated and real time advance by the same amount
    pub fn new(delta: f32) -> Self {
        Self {
            delta,
            real_delta: delta,
        }
    }

    /// Simulated time is paused or scaled independently of real time
    pub fn split(delta: f32, real_delta: f32) -> Self {
        Self { delta, real_delta }
    }
}

impl Clock for StepClock {
    fn delta_time(&self) -> f32 {
        self.delta
    }

    fn real_delta_time(&self) -> f32 {
        self.real_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_defaults() {
        let clock = GameClock::new();
        assert_eq!(clock.max_frame_time, 0.25);
        assert_eq!(clock.total_time, 0.0);
        assert_eq!(clock.delta_time(), 0.0);
    }

    #[test]
    fn test_first_tick_zero_delta() {
        let mut clock = GameClock::new();
        clock.tick();
        assert_eq!(clock.delta_time(), 0.0);
        assert_eq!(clock.real_delta_time(), 0.0);
    }

    #[test]
    fn time_scale_affects_only_simulated_time() {
        let mut clock = GameClock::new();
        clock.time_scale = 0.5;
        clock.advance(0.1);
        assert!((clock.delta_time() - 0.05).abs() < 1e-6);
        assert!((clock.real_delta_time() - 0.1).abs() < 1e-6);
        assert!((clock.total_time - 0.05).abs() < 1e-9);
        assert!((clock.real_total_time - 0.1).abs() < 1e-9);
    }

    #[test]
    fn paused_clock_reports_zero_simulated_time() {
        let mut clock = GameClock::new();
        clock.pause();
        clock.advance(0.1);
        assert_eq!(clock.delta_time(), 0.0);
        assert!(clock.real_delta_time() > 0.0);

        clock.resume();
        clock.advance(0.1);
        assert!(clock.delta_time() > 0.0);
    }

    #[test]
    fn large_frames_are_clamped() {
        let mut clock = GameClock::new();
        clock.advance(5.0);
        assert!((clock.real_delta_time() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn total_time_tracks_scaled_steps() {
        let mut clock = GameClock::new();
        clock.time_scale = 2.0;
        for _ in 0..4 {
            clock.advance(0.1);
        }
        assert!((clock.total_time - 0.8).abs() < 1e-9);
        assert!((clock.real_total_time - 0.4).abs() < 1e-9);
    }

    #[test]
    fn step_clock_split() {
        let clock = StepClock::split(0.0, 0.016);
        assert_eq!(clock.delta_time(), 0.0);
        assert_eq!(clock.real_delta_time(), 0.016);
    }
}
