/// Frame metadata - carries frame number and timing info
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInfo {
    pub number: u64,
    /// Seconds of animation time elapsed up to and including this frame
    pub time: f32,
    /// Seconds since the previous frame
    pub delta: f32,
}

impl FrameInfo {
    pub fn new(number: u64, time: f32, delta: f32) -> Self {
        Self { number, time, delta }
    }

    /// Frame that follows this one after `delta` seconds
    pub fn next(&self, delta: f32) -> Self {
        Self::new(self.number + 1, self.time + delta, delta)
    }
}
