use std::time::Instant;

/// Shared frame clock
///
/// Each query returns the seconds elapsed since the previous query, so one
/// read per frame drives every animation by the same amount.
#[derive(Debug)]
pub struct Clock {
    last_tick: Instant,
}

impl Clock {
    /// Create new clock starting now
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
        }
    }

    /// Seconds since the previous call (or since creation), advancing the clock
    pub fn delta(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        delta
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn clock_measures_delta() {
        let mut clock = Clock::new();

        thread::sleep(Duration::from_millis(10));
        let delta = clock.delta();

        assert!(delta >= 0.009);
    }

    #[test]
    fn delta_restarts_after_each_query() {
        let mut clock = Clock::new();

        thread::sleep(Duration::from_millis(20));
        let first = clock.delta();
        let second = clock.delta();

        assert!(second < first);
    }
}
