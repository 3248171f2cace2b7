//! Playback clock sampling state.
//!
//! The sampler does not own a thread or a timer. It tracks whether a poll
//! loop is live (and which one), whether a programmatic seek is settling,
//! and the last published playback time.

/// Identifies one poll loop; a restarted loop gets a new generation.
pub type PollGeneration = u64;

#[derive(Debug, Clone, Default)]
pub struct ClockSampler {
    generation: PollGeneration,
    running: bool,
    seeking: bool,
    current_time: f64,
}

impl ClockSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a poll loop, superseding any previous one
    pub fn start(&mut self) -> PollGeneration {
        self.generation = self.generation.wrapping_add(1);
        self.running = true;
        self.generation
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.seeking = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Raise the seek guard and jump the published time to the seek target
    pub fn begin_seek(&mut self, target: f64) {
        self.seeking = true;
        self.current_time = target;
    }

    pub fn settle(&mut self) {
        self.seeking = false;
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking
    }

    /// Whether a raw read would currently be published
    pub fn accepts_samples(&self) -> bool {
        self.running && !self.seeking
    }

    /// Publish a raw player read. Returns `None` when the read is discarded.
    pub fn publish(&mut self, raw: f64) -> Option<f64> {
        if !self.accepts_samples() || !raw.is_finite() {
            return None;
        }
        self.current_time = raw.max(0.0);
        Some(self.current_time)
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }
}
