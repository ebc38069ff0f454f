use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ringbuf::HeapProd;
use ringbuf::traits::Producer;

use crate::clock::Clock;
use crate::codec;
use crate::resample::MonoResampler;

/// A chunk admitted to the playback schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledChunk {
    pub id: u64,
    pub start: f64,
    pub duration: f64,
}

/// Gapless sequencing of streamed audio chunks.
///
/// A single watermark holds the earliest time the next chunk may start.
/// Each arriving chunk starts at `max(watermark, now)` and advances the
/// watermark by its own duration, so a chunk arriving early waits for its
/// predecessor and a chunk arriving late starts immediately. Arrival order
/// is playback order; nothing is reordered.
#[derive(Debug)]
pub struct ChunkScheduler {
    next_start: f64,
    active: HashMap<u64, ScheduledChunk>,
    next_id: u64,
}

impl ChunkScheduler {
    pub fn new(now: f64) -> Self {
        Self {
            next_start: now,
            active: HashMap::new(),
            next_id: 0,
        }
    }

    /// Admits a chunk of the given duration, returning its slot.
    pub fn schedule(&mut self, duration: f64, now: f64) -> ScheduledChunk {
        self.next_start = self.next_start.max(now);
        let chunk = ScheduledChunk {
            id: self.next_id,
            start: self.next_start,
            duration,
        };
        self.next_id += 1;
        self.next_start += duration;
        self.active.insert(chunk.id, chunk);
        chunk
    }

    /// Removes a chunk that finished playing naturally.
    pub fn finish(&mut self, id: u64) -> bool {
        self.active.remove(&id).is_some()
    }

    /// Removes every chunk whose scheduled end has passed.
    pub fn reap(&mut self, now: f64) -> Vec<u64> {
        let ended: Vec<u64> = self
            .active
            .values()
            .filter(|c| c.start + c.duration <= now)
            .map(|c| c.id)
            .collect();
        for id in &ended {
            self.active.remove(id);
        }
        ended
    }

    /// Barge-in: every scheduled chunk stops, the active set empties, and
    /// the watermark resets to the present so the next chunk starts
    /// immediately instead of at a stale future time.
    pub fn interrupt(&mut self, now: f64) -> Vec<u64> {
        let stopped: Vec<u64> = self.active.keys().copied().collect();
        self.active.clear();
        self.next_start = now;
        stopped
    }

    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

/// Live playback sink: decodes arriving chunks, keeps the schedule, and
/// pushes resampled samples into the shared ring buffer the output stream
/// drains. Interruption raises a flush flag the output side honors by
/// clearing the ring buffer.
pub struct LivePlayback<C: Clock> {
    clock: C,
    scheduler: ChunkScheduler,
    resampler: MonoResampler,
    producer: HeapProd<f32>,
    flush: Arc<AtomicBool>,
}

const RESAMPLER_CHUNK: usize = 1024;

impl<C: Clock> LivePlayback<C> {
    pub fn new(clock: C, output_rate: f64, producer: HeapProd<f32>) -> anyhow::Result<Self> {
        let scheduler = ChunkScheduler::new(clock.now());
        Ok(Self {
            clock,
            scheduler,
            resampler: MonoResampler::new(codec::OUTPUT_SAMPLE_RATE, output_rate, RESAMPLER_CHUNK)?,
            producer,
            flush: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Shared flag the output callback checks each cycle; when set, the
    /// callback clears the ring buffer and lowers it.
    pub fn flush_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flush)
    }

    /// Decodes and enqueues one base64 PCM16 chunk. Returns the schedule
    /// slot, or `None` for an undecodable fragment.
    pub fn push_chunk(&mut self, fragment: &str) -> Option<ScheduledChunk> {
        let samples = codec::decode(fragment);
        if samples.is_empty() {
            return None;
        }
        let duration = codec::duration_secs(samples.len(), codec::OUTPUT_SAMPLE_RATE);
        let now = self.clock.now();
        self.scheduler.reap(now);
        let chunk = self.scheduler.schedule(duration, now);

        let resampled = self.resampler.push(&samples);
        let pushed = self.producer.push_slice(&resampled);
        if pushed < resampled.len() {
            tracing::warn!(
                dropped = resampled.len() - pushed,
                "output ring buffer overflow"
            );
        }
        Some(chunk)
    }

    /// Server signalled user barge-in: flush pending playback and reset the
    /// schedule clock.
    pub fn interrupt(&mut self) -> Vec<u64> {
        let stopped = self.scheduler.interrupt(self.clock.now());
        self.flush.store(true, Ordering::SeqCst);
        tracing::debug!(stopped = stopped.len(), "playback interrupted");
        stopped
    }

    pub fn scheduler(&self) -> &ChunkScheduler {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use ringbuf::HeapRb;
    use ringbuf::traits::{Consumer, Observer, Split};

    #[test]
    fn consecutive_chunks_are_scheduled_back_to_back() {
        let mut s = ChunkScheduler::new(10.0);
        // Three chunks arrive in a burst, faster than real time.
        let a = s.schedule(0.5, 10.0);
        let b = s.schedule(0.25, 10.01);
        let c = s.schedule(0.4, 10.02);
        assert_eq!(a.start, 10.0);
        assert_eq!(b.start, a.start + a.duration);
        assert_eq!(c.start, b.start + b.duration);
        assert_eq!(s.active_count(), 3);
    }

    #[test]
    fn late_chunk_starts_immediately_without_regressing() {
        let mut s = ChunkScheduler::new(0.0);
        let a = s.schedule(0.2, 0.0);
        // Next chunk arrives well after the previous one finished.
        let b = s.schedule(0.2, 5.0);
        assert_eq!(a.start, 0.0);
        assert_eq!(b.start, 5.0);
        assert_eq!(s.next_start(), 5.2);
    }

    #[test]
    fn interruption_flushes_and_resets_the_watermark() {
        let mut s = ChunkScheduler::new(0.0);
        s.schedule(1.0, 0.0);
        s.schedule(1.0, 0.0);
        s.schedule(1.0, 0.0);
        assert_eq!(s.next_start(), 3.0);

        let stopped = s.interrupt(0.7);
        assert_eq!(stopped.len(), 3);
        assert_eq!(s.active_count(), 0);
        assert_eq!(s.next_start(), 0.7);

        // The next chunk starts at the interruption time, not at the stale
        // future watermark.
        let next = s.schedule(0.5, 0.7);
        assert_eq!(next.start, 0.7);
        assert!(next.start >= 0.7);
    }

    #[test]
    fn natural_completion_removes_from_the_active_set() {
        let mut s = ChunkScheduler::new(0.0);
        let a = s.schedule(0.5, 0.0);
        let b = s.schedule(0.5, 0.0);
        assert!(s.finish(a.id));
        assert!(!s.finish(a.id));
        assert_eq!(s.active_count(), 1);

        let ended = s.reap(1.1);
        assert_eq!(ended, vec![b.id]);
        assert_eq!(s.active_count(), 0);
    }

    #[test]
    fn live_playback_pushes_decoded_samples_and_tracks_schedule() {
        let clock = ManualClock::new(0.0);
        let rb = HeapRb::<f32>::new(48_000);
        let (prod, mut cons) = rb.split();
        let mut playback =
            LivePlayback::new(clock.clone(), codec::OUTPUT_SAMPLE_RATE, prod).unwrap();

        // 2400 samples = 100 ms at 24 kHz.
        let fragment = codec::encode(&vec![0.25f32; 2400]);
        let first = playback.push_chunk(&fragment).expect("chunk scheduled");
        let second = playback.push_chunk(&fragment).expect("chunk scheduled");
        assert!((first.duration - 0.1).abs() < 1e-9);
        assert_eq!(second.start, first.start + first.duration);
        assert!(cons.occupied_len() > 0);

        assert!(playback.push_chunk("@@not-base64@@").is_none());
    }

    #[test]
    fn live_interrupt_raises_the_flush_flag() {
        let clock = ManualClock::new(0.0);
        let rb = HeapRb::<f32>::new(48_000);
        let (prod, mut cons) = rb.split();
        let mut playback =
            LivePlayback::new(clock.clone(), codec::OUTPUT_SAMPLE_RATE, prod).unwrap();
        let flush = playback.flush_flag();

        let fragment = codec::encode(&vec![0.5f32; 2400]);
        playback.push_chunk(&fragment);
        clock.advance(0.01);
        let stopped = playback.interrupt();
        assert_eq!(stopped.len(), 1);
        assert!(flush.swap(false, Ordering::SeqCst));
        // The output side clears the queue when it sees the flag.
        cons.clear();
        assert_eq!(cons.occupied_len(), 0);

        // The schedule restarts from "now".
        assert_eq!(playback.scheduler().next_start(), 0.01);
        assert_eq!(playback.scheduler().active_count(), 0);
    }
}
