/// Fixed timestep accumulator.
/// Keeps the simulation stepping at a constant rate regardless of host frame time.
pub struct FixedTimestep {
    /// The fixed delta time per step.
    dt: f32,
    /// Accumulated time from variable frame deltas.
    accumulator: f32,
    /// Upper bound on steps run for a single frame.
    max_steps: u32,
}

impl FixedTimestep {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            accumulator: 0.0,
            max_steps: 10,
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Add frame time to the accumulator. Returns the number of fixed steps to run.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        // Hosts occasionally hand over negative or NaN deltas after a pause.
        if !frame_dt.is_finite() || frame_dt <= 0.0 {
            return 0;
        }
        self.accumulator += frame_dt;
        self.accumulator = self.accumulator.min(self.dt * self.max_steps as f32);
        let steps = (self.accumulator / self.dt) as u32;
        self.accumulator -= steps as f32 * self.dt;
        steps
    }

    /// Interpolation alpha between steps (0.0 to 1.0).
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }
}

/// Monotonic simulation clock fed from host frame time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    now: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, dt: f32) -> f64 {
        if dt.is_finite() && dt > 0.0 {
            self.now += dt as f64;
        }
        self.now
    }

    pub fn now(&self) -> f64 {
        self.now
    }
}

/// A point on the simulation clock after which a bounded wait gives up.
///
/// Measured in simulated seconds, not wall time. Frame time that
/// [`FixedTimestep`] drops after a host stall never reaches the clock, so a
/// stall cannot expire an approach, a hold or an asset wait that the
/// simulation has not actually spent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deadline {
    at: f64,
}

impl Deadline {
    pub fn after(now: f64, seconds: f32) -> Self {
        Self {
            at: now + seconds.max(0.0) as f64,
        }
    }

    pub fn expired(&self, now: f64) -> bool {
        now >= self.at
    }

    pub fn remaining(&self, now: f64) -> f32 {
        (self.at - now).max(0.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_step_exact() {
        let mut ts = FixedTimestep::new(1.0 / 60.0);
        assert_eq!(ts.accumulate(1.0 / 60.0), 1);
    }

    #[test]
    fn accumulates_partial() {
        let mut ts = FixedTimestep::new(1.0 / 60.0);
        assert_eq!(ts.accumulate(0.008), 0);
        assert_eq!(ts.accumulate(0.010), 1);
    }

    #[test]
    fn caps_steps_per_frame() {
        let mut ts = FixedTimestep::new(1.0 / 60.0).with_max_steps(4);
        assert_eq!(ts.accumulate(1.0), 4);
    }

    #[test]
    fn ignores_bad_frame_times() {
        let mut ts = FixedTimestep::new(1.0 / 60.0);
        assert_eq!(ts.accumulate(-1.0), 0);
        assert_eq!(ts.accumulate(f32::NAN), 0);
        assert_eq!(ts.alpha(), 0.0);
    }

    #[test]
    fn deadline_expires_on_clock() {
        let mut clock = SimClock::new();
        let deadline = Deadline::after(clock.now(), 0.5);
        clock.advance(0.25);
        assert!(!deadline.expired(clock.now()));
        assert!((deadline.remaining(clock.now()) - 0.25).abs() < 1e-6);
        clock.advance(0.25);
        assert!(deadline.expired(clock.now()));
        assert_eq!(deadline.remaining(clock.now()), 0.0);
    }

    #[test]
    fn stalled_frame_does_not_expire_deadline() {
        let dt = 1.0 / 60.0;
        let mut ts = FixedTimestep::new(dt).with_max_steps(4);
        let mut clock = SimClock::new();
        let deadline = Deadline::after(clock.now(), 1.0);

        // a five second stall runs only the capped steps
        for _ in 0..ts.accumulate(5.0) {
            clock.advance(dt);
        }
        assert!(clock.now() < 0.1);
        assert!(!deadline.expired(clock.now()));
    }
}
