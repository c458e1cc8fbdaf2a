//! Time management utilities

use std::time::{Duration, Instant};

/// Fixed-step tick clock
///
/// Accumulates wall-clock time and hands out whole simulation steps so the
/// swarm always advances with a constant `delta_time`.
pub struct TickClock {
    last_update: Instant,
    step: f32,
    accumulator: f32,
    max_steps_per_update: u32,
    tick_count: u64,
}

impl TickClock {
    /// Create a clock producing steps of `step` seconds
    pub fn new(step: f32) -> Self {
        Self {
            last_update: Instant::now(),
            step,
            accumulator: 0.0,
            max_steps_per_update: 8,
            tick_count: 0,
        }
    }

    /// Limit the number of steps one update may hand out (spiral-of-death guard)
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps_per_update = max_steps.max(1);
        self
    }

    /// Sample the wall clock and return how many steps are due
    pub fn update(&mut self) -> u32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f32();
        self.last_update = now;
        self.advance(elapsed)
    }

    /// Feed `elapsed` seconds into the accumulator and return how many steps are due
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        if self.step <= 0.0 {
            return 0;
        }
        self.accumulator += elapsed;
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps_per_update {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_steps_per_update {
            self.accumulator = self.accumulator.min(self.step);
        }
        self.tick_count += u64::from(steps);
        steps
    }

    /// Seconds per step
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Total steps handed out
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start_time = Some(Instant::now());
        stopwatch
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        self.elapsed + self.start_time.map_or(Duration::ZERO, |start| start.elapsed())
    }

    /// Get the elapsed time in milliseconds
    pub fn elapsed_millis(&self) -> f32 {
        self.elapsed().as_secs_f32() * 1000.0
    }
}
