use std::time::{Duration, Instant};

/// Counts presented frames and reports the total once per elapsed second.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    window: Duration,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self { window_start: now, frames: 0, window: Duration::from_secs(1) }
    }

    /// Records one frame at `now`.
    ///
    /// Returns the number of frames counted in the window once at least one
    /// second has passed since the window started, then starts a new window.
    pub fn frame(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now.saturating_duration_since(self.window_start) < self.window {
            return None;
        }

        let n = self.frames;
        self.frames = 0;
        self.window_start = now;
        Some(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_after_one_second() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::new(t0);
        for i in 1..60 {
            assert_eq!(fps.frame(t0 + Duration::from_millis(i * 16)), None);
        }
        assert_eq!(fps.frame(t0 + Duration::from_millis(1000)), Some(60));
    }

    #[test]
    fn window_restarts_after_report() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::new(t0);
        assert_eq!(fps.frame(t0 + Duration::from_secs(1)), Some(1));
        assert_eq!(fps.frame(t0 + Duration::from_millis(1500)), None);
        assert_eq!(fps.frame(t0 + Duration::from_secs(2)), Some(2));
    }
}
