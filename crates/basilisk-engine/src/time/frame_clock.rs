use std::time::{Duration, Instant};

/// Shader time added per tick unless configured otherwise.
pub const DEFAULT_TIME_STEP: f32 = 0.01;

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,

    /// Value fed to the shaders' `time` uniform.
    ///
    /// Advances by a fixed step per tick, independent of wall-clock time.
    pub shader_time: f32,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// One clock per window so delta-time state is never shared.
///
/// Delta time is clamped to avoid pathological values when the application is paused
/// by the debugger, minimized, or stalls.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
    time_step: f32,
    shader_time: f32,
}

impl FrameClock {
    /// Creates a new clock with default clamps and time step.
    ///
    /// Clamp rationale:
    /// - minimum prevents zero-dt behavior from tight loops on some platforms
    /// - maximum prevents simulation explosions after long stalls
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min: Duration::from_micros(100), // 0.0001s
            dt_max: Duration::from_millis(250), // 0.25s
            time_step: DEFAULT_TIME_STEP,
            shader_time: 0.0,
        }
    }

    /// Sets the shader-time increment per tick.
    pub fn with_time_step(mut self, step: f32) -> Self {
        self.time_step = step;
        self
    }

    /// Shader time of the last tick.
    pub fn shader_time(&self) -> f32 {
        self.shader_time
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;
        self.shader_time += self.time_step;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
            shader_time: self.shader_time,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_time_advances_by_fixed_step() {
        let mut clock = FrameClock::new();
        let a = clock.tick();
        let b = clock.tick();
        let c = clock.tick();
        assert!((a.shader_time - 0.01).abs() < 1e-6);
        assert!((b.shader_time - 0.02).abs() < 1e-6);
        assert!((c.shader_time - 0.03).abs() < 1e-6);
    }

    #[test]
    fn custom_time_step() {
        let mut clock = FrameClock::new().with_time_step(0.5);
        clock.tick();
        assert_eq!(clock.tick().shader_time, 1.0);
    }

    #[test]
    fn frame_index_counts_from_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick().frame_index, 0);
        assert_eq!(clock.tick().frame_index, 1);
    }

    #[test]
    fn dt_respects_clamps() {
        let mut clock = FrameClock::new();
        let ft = clock.tick();
        assert!(ft.dt >= 0.0001 && ft.dt <= 0.25);

        clock.last -= Duration::from_secs(5);
        assert!((clock.tick().dt - 0.25).abs() < 1e-6);
    }
}
