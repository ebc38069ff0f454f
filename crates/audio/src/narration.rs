use std::sync::Arc;

use crate::clock::Clock;
use crate::codec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NarrationState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Instruction to the output side: play `samples` starting `offset_secs`
/// into the buffer.
#[derive(Debug, Clone)]
pub struct PlaybackCue {
    pub samples: Arc<Vec<f32>>,
    pub offset_secs: f64,
}

/// Pause/resume bookkeeping for the one-shot narration buffer.
///
/// The decoded buffer is cached after the first generation so pausing and
/// resuming never re-fetch. Pausing accumulates the elapsed play interval
/// into a running offset; resuming restarts from that offset; a natural end
/// resets the offset to zero so the next play starts from the top.
pub struct NarrationPlayer<C: Clock> {
    clock: C,
    sample_rate: f64,
    buffer: Option<Arc<Vec<f32>>>,
    state: NarrationState,
    started_at: f64,
    paused_offset: f64,
}

impl<C: Clock> NarrationPlayer<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            sample_rate: codec::OUTPUT_SAMPLE_RATE,
            buffer: None,
            state: NarrationState::Stopped,
            started_at: 0.0,
            paused_offset: 0.0,
        }
    }

    pub fn state(&self) -> NarrationState {
        self.state
    }

    pub fn has_audio(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn duration(&self) -> Option<f64> {
        self.buffer
            .as_ref()
            .map(|b| codec::duration_secs(b.len(), self.sample_rate))
    }

    /// Caches a freshly generated buffer and starts playback from the top.
    pub fn load(&mut self, samples: Vec<f32>) -> PlaybackCue {
        let buffer = Arc::new(samples);
        self.buffer = Some(Arc::clone(&buffer));
        self.paused_offset = 0.0;
        self.started_at = self.clock.now();
        self.state = NarrationState::Playing;
        PlaybackCue {
            samples: buffer,
            offset_secs: 0.0,
        }
    }

    /// Stops the active source and accumulates the elapsed play interval.
    /// Returns the total paused offset.
    pub fn pause(&mut self) -> f64 {
        if self.state == NarrationState::Playing {
            self.paused_offset += self.clock.now() - self.started_at;
            self.state = NarrationState::Paused;
        }
        self.paused_offset
    }

    /// Restarts the cached buffer from the accumulated offset.
    pub fn resume(&mut self) -> Option<PlaybackCue> {
        if self.state == NarrationState::Playing {
            return None;
        }
        let buffer = self.buffer.as_ref()?;
        self.started_at = self.clock.now();
        self.state = NarrationState::Playing;
        Some(PlaybackCue {
            samples: Arc::clone(buffer),
            offset_secs: self.paused_offset,
        })
    }

    /// The source reached its natural end: a subsequent play restarts from
    /// the beginning, which is what distinguishes "finished" from "paused".
    pub fn finished(&mut self) {
        self.paused_offset = 0.0;
        self.state = NarrationState::Stopped;
    }

    /// Drops the cached buffer entirely (a new query invalidates it).
    pub fn clear(&mut self) {
        self.buffer = None;
        self.paused_offset = 0.0;
        self.state = NarrationState::Stopped;
    }

    /// Current position within the buffer.
    pub fn position(&self) -> f64 {
        match self.state {
            NarrationState::Playing => self.paused_offset + (self.clock.now() - self.started_at),
            _ => self.paused_offset,
        }
    }
}
