use std::time::Duration;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, StreamConfig};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use tokio::sync::mpsc;

use afrolearn_audio::codec::OUTPUT_SAMPLE_RATE;
use afrolearn_audio::narration::PlaybackCue;
use afrolearn_audio::resample::MonoResampler;

const RESAMPLER_CHUNK: usize = 1024;
const FEED_SLICE: usize = 2048;

#[derive(Debug)]
pub enum NarrationEvent {
    Finished,
}

/// Realizes narration playback cues on the output device. Each cue gets a
/// fresh stream and a feed task; pausing simply tears both down, since the
/// pause/resume arithmetic lives in `NarrationPlayer`.
pub struct Narrator {
    device: Device,
    config: StreamConfig,
    events_tx: mpsc::Sender<NarrationEvent>,
    active: Option<ActivePlayback>,
}

struct ActivePlayback {
    // Held for its side effect; dropping it stops the device stream.
    _stream: cpal::Stream,
    feed: tokio::task::JoinHandle<()>,
}

impl Narrator {
    pub fn new(device: Device, events_tx: mpsc::Sender<NarrationEvent>) -> Result<Self> {
        let default = device
            .default_output_config()
            .context("failed to get default output config")?;
        let config = StreamConfig {
            channels: default.channels(),
            sample_rate: default.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };
        Ok(Self {
            device,
            config,
            events_tx,
            active: None,
        })
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    /// Starts playing a cue from its offset. Any active playback stops
    /// first.
    pub fn play(&mut self, cue: &PlaybackCue) -> Result<()> {
        self.stop();

        let device_rate = self.config.sample_rate.0 as f64;
        let channels = self.config.channels as usize;

        // Resample the remainder of the buffer up front; narration clips
        // are small and fully decoded already.
        let start = ((cue.offset_secs * OUTPUT_SAMPLE_RATE) as usize).min(cue.samples.len());
        let mut resampler = MonoResampler::new(OUTPUT_SAMPLE_RATE, device_rate, RESAMPLER_CHUNK)?;
        let mut samples = resampler.push(&cue.samples[start..]);
        samples.extend(resampler.flush());

        let ring = HeapRb::<f32>::new(device_rate as usize);
        let (mut producer, mut consumer) = ring.split();

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let sample = consumer.try_pop().unwrap_or(0.0);
                        for slot in frame.iter_mut() {
                            *slot = sample;
                        }
                    }
                },
                move |err| tracing::error!("narration output stream error: {err}"),
                None,
            )
            .context("failed to build narration output stream")?;
        stream.play().context("failed to start narration playback")?;

        let events_tx = self.events_tx.clone();
        let feed = tokio::spawn(async move {
            let mut offset = 0;
            while offset < samples.len() {
                let end = (offset + FEED_SLICE).min(samples.len());
                offset += producer.push_slice(&samples[offset..end]);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            // Everything is queued; wait for the device to drain it.
            while producer.occupied_len() > 0 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            let _ = events_tx.send(NarrationEvent::Finished).await;
        });

        self.active = Some(ActivePlayback {
            _stream: stream,
            feed,
        });
        Ok(())
    }

    /// Stops the active source, if any. Offset bookkeeping is the
    /// player's concern, not ours.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.feed.abort();
        }
    }

    /// The feed task reported a natural end.
    pub fn clear_finished(&mut self) {
        self.active = None;
    }
}
