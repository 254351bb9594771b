use std::thread;
use std::time::{Duration, Instant};

/// Period of the render timer unless configured otherwise.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(10);

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame, in seconds.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Fixed-interval frame trigger.
///
/// Deadlines advance by whole intervals from the start, so a slow frame does
/// not shift every later one. After a stall longer than one interval the
/// missed deadlines are skipped, not replayed.
#[derive(Debug, Clone)]
pub struct FrameTicker {
    interval: Duration,
    next: Instant,
    last: Instant,
    frame_index: u64,
    dt_max: Duration,
}

impl FrameTicker {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        let interval = interval.max(Duration::from_micros(100));
        Self {
            interval,
            next: start + interval,
            last: start,
            frame_index: 0,
            dt_max: Duration::from_millis(250),
        }
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Non-blocking: returns a frame if the next deadline has passed at
    /// `now`.
    pub fn poll(&mut self, now: Instant) -> Option<FrameTime> {
        if now < self.next {
            return None;
        }

        while self.next <= now {
            self.next += self.interval;
        }

        let dt = now.saturating_duration_since(self.last).min(self.dt_max);
        self.last = now;

        let ft = FrameTime { dt: dt.as_secs_f32(), now, frame_index: self.frame_index };
        self.frame_index = self.frame_index.wrapping_add(1);
        Some(ft)
    }

    /// Sleeps until the next deadline, then returns that frame.
    pub fn tick(&mut self) -> FrameTime {
        loop {
            let now = Instant::now();
            if let Some(ft) = self.poll(now) {
                return ft;
            }
            thread::sleep(self.next.saturating_duration_since(now));
        }
    }
}

impl Default for FrameTicker {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn nothing_before_first_deadline() {
        let t0 = Instant::now();
        let mut ticker = FrameTicker::starting_at(10 * MS, t0);
        assert!(ticker.poll(t0 + 9 * MS).is_none());
        assert!(ticker.poll(t0 + 10 * MS).is_some());
    }

    #[test]
    fn frames_are_numbered_and_timed() {
        let t0 = Instant::now();
        let mut ticker = FrameTicker::starting_at(10 * MS, t0);
        let a = ticker.poll(t0 + 10 * MS).unwrap();
        let b = ticker.poll(t0 + 20 * MS).unwrap();
        assert_eq!((a.frame_index, b.frame_index), (0, 1));
        assert!((b.dt - 0.010).abs() < 1e-6);
    }

    #[test]
    fn stall_skips_missed_deadlines() {
        let t0 = Instant::now();
        let mut ticker = FrameTicker::starting_at(10 * MS, t0);
        ticker.poll(t0 + 55 * MS).unwrap();
        // next deadline is 60ms, not 20ms
        assert!(ticker.poll(t0 + 59 * MS).is_none());
        assert!(ticker.poll(t0 + 60 * MS).is_some());
    }

    #[test]
    fn dt_is_clamped_after_long_stall() {
        let t0 = Instant::now();
        let mut ticker = FrameTicker::starting_at(10 * MS, t0);
        let ft = ticker.poll(t0 + 2000 * MS).unwrap();
        assert!((ft.dt - 0.25).abs() < 1e-6);
    }

    #[test]
    fn tick_blocks_until_deadline() {
        let mut ticker = FrameTicker::new(2 * MS);
        let start = Instant::now();
        ticker.tick();
        assert!(start.elapsed() >= MS);
    }
}
