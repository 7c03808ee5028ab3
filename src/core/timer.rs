/// Throttled timer - minimum interval between fires
#[derive(Debug, Clone, Copy)]
pub struct Throttled {
    min_interval: f32,
    time_since_last: f32,
}

impl Throttled {
    /// Create throttled timer; the first fire happens after `min_interval`
    pub fn new(min_interval: f32) -> Self {
        Self {
            min_interval,
            time_since_last: 0.0,
        }
    }

    /// Accumulate `delta`; returns the time elapsed since the previous fire
    /// once at least `min_interval` has passed
    pub fn try_tick(&mut self, delta: f32) -> Option<f32> {
        self.time_since_last += delta;

        if self.time_since_last >= self.min_interval {
            let elapsed = self.time_since_last;
            self.time_since_last = 0.0;
            Some(elapsed)
        } else {
            None
        }
    }
}
