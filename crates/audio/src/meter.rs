use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Normalized amplitude above which a side counts as active. This is a
/// display heuristic, not voice activity detection: there is no debouncing,
/// and flicker right at the boundary is an accepted property.
pub const ACTIVITY_THRESHOLD: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    Speaking,
    Listening,
}

/// Mean absolute amplitude of a frame, clamped to [0, 1].
pub fn frame_level(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f32 = frame.iter().map(|s| s.abs()).sum();
    (sum / frame.len() as f32).clamp(0.0, 1.0)
}

/// Classifies one tick from the two sides' levels. Output wins over input:
/// while the model is audibly speaking the indicator says so even if the
/// microphone also picks something up.
pub fn classify(input_level: f32, output_level: f32) -> Activity {
    if output_level > ACTIVITY_THRESHOLD {
        Activity::Speaking
    } else if input_level > ACTIVITY_THRESHOLD {
        Activity::Listening
    } else {
        Activity::Idle
    }
}

/// Bar-visualizer height in [0, 1]: the louder side, amplified 4x for
/// visibility.
pub fn display_level(input_level: f32, output_level: f32) -> f32 {
    (input_level.max(output_level) * 4.0).min(1.0)
}

/// An f32 level shared between an audio callback thread and the UI tick,
/// stored as atomic bits.
#[derive(Debug, Default, Clone)]
pub struct SharedLevel(Arc<AtomicU32>);

impl SharedLevel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, level: f32) {
        self.0.store(level.to_bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Snapshot of both sides for one animation tick.
#[derive(Debug, Clone)]
pub struct ActivityMeter {
    input: SharedLevel,
    output: SharedLevel,
}

impl ActivityMeter {
    pub fn new() -> Self {
        Self {
            input: SharedLevel::new(),
            output: SharedLevel::new(),
        }
    }

    pub fn input(&self) -> SharedLevel {
        self.input.clone()
    }

    pub fn output(&self) -> SharedLevel {
        self.output.clone()
    }

    pub fn activity(&self) -> Activity {
        classify(self.input.load(), self.output.load())
    }

    pub fn display_level(&self) -> f32 {
        display_level(self.input.load(), self.output.load())
    }
}

impl Default for ActivityMeter {
    fn default() -> Self {
        Self::new()
    }
}
