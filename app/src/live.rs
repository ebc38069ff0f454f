use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FrameCount, StreamConfig};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Split};
use tokio::sync::mpsc;

use afrolearn_audio::capture::CaptureEncoder;
use afrolearn_audio::meter::{self, ActivityMeter};
use afrolearn_audio::playback::LivePlayback;
use afrolearn_audio::{Activity, MonotonicClock};
use afrolearn_core::language::Language;
use afrolearn_live::types::{Blob, Setup};

const INPUT_CHUNK_SIZE: usize = 1024;
const OUTPUT_LATENCY_MS: usize = 1000;

#[derive(Debug)]
pub enum LiveEvent {
    Connected,
    Interrupted,
    TurnComplete,
}

/// One live conversation overlay. This object exclusively owns the input
/// stream, the output stream with its ring buffer, the playback schedule
/// and the remote session handle; `shutdown` releases all of them on every
/// exit path.
pub struct LiveAudioSession {
    client: afrolearn_live::Client,
    meter: ActivityMeter,
    events_rx: mpsc::Receiver<LiveEvent>,
    // Streams are held for their side effects; dropping them stops the
    // device callbacks.
    _input_stream: cpal::Stream,
    _output_stream: cpal::Stream,
    send_task: tokio::task::JoinHandle<()>,
    recv_task: tokio::task::JoinHandle<()>,
}

impl LiveAudioSession {
    /// Connects and wires both audio directions. On any error the partial
    /// setup is dropped, which releases whatever was already acquired.
    pub async fn start(
        config: afrolearn_live::Config,
        language: &'static Language,
        topic: Option<&str>,
        input_device: &Device,
        output_device: &Device,
    ) -> Result<Self> {
        let client = afrolearn_live::connect(config.clone()).await?;

        let instructions = afrolearn_gemini::prompts::live_system_instruction(language, topic);
        client
            .setup(
                Setup::new(config.model())
                    .with_audio_response()
                    .with_voice(afrolearn_gemini::TTS_VOICE)
                    .with_system_instruction(instructions),
            )
            .await
            .context("failed to send live session setup")?;

        let meter = ActivityMeter::new();
        let (events_tx, events_rx) = mpsc::channel(64);

        // Output: server chunks -> playback schedule -> ring buffer -> device.
        let output_config = output_device
            .default_output_config()
            .context("failed to get default output config")?;
        let output_config = StreamConfig {
            channels: output_config.channels(),
            sample_rate: output_config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };
        let output_rate = output_config.sample_rate.0 as f64;
        let output_channels = output_config.channels as usize;

        let ring = HeapRb::<f32>::new(output_rate as usize * OUTPUT_LATENCY_MS / 1000);
        let (producer, mut consumer) = ring.split();
        let mut playback = LivePlayback::new(MonotonicClock::new(), output_rate, producer)?;
        let flush = playback.flush_flag();
        let output_level = meter.output();

        let output_stream = output_device
            .build_output_stream(
                &output_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if flush.swap(false, std::sync::atomic::Ordering::SeqCst) {
                        consumer.clear();
                    }
                    for frame in data.chunks_mut(output_channels) {
                        let sample = consumer.try_pop().unwrap_or(0.0);
                        for slot in frame.iter_mut() {
                            *slot = sample;
                        }
                    }
                    output_level.store(meter::frame_level(data));
                },
                move |err| tracing::error!("live output stream error: {err}"),
                None,
            )
            .context("failed to build live output stream")?;
        output_stream
            .play()
            .context("failed to start live output stream")?;

        let mut server_events = client.server_events()?;
        let recv_events_tx = events_tx.clone();
        let recv_task = tokio::spawn(async move {
            loop {
                match server_events.recv().await {
                    Ok(message) => {
                        if message.is_setup_complete() {
                            let _ = recv_events_tx.send(LiveEvent::Connected).await;
                        }
                        if message.is_interrupted() {
                            playback.interrupt();
                            let _ = recv_events_tx.send(LiveEvent::Interrupted).await;
                        }
                        for chunk in message.audio_chunks() {
                            playback.push_chunk(&chunk.data);
                        }
                        if message.is_turn_complete() {
                            let _ = recv_events_tx.send(LiveEvent::TurnComplete).await;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("live event stream lagged by {n} messages");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        tracing::info!("live event stream closed");
                        break;
                    }
                }
            }
        });

        // Input: device -> frame channel -> encode -> send pump. Frames go
        // out as soon as they are produced; there is no batching.
        let input_config = input_device
            .default_input_config()
            .context("failed to get default input config")?;
        let input_config = StreamConfig {
            channels: input_config.channels(),
            sample_rate: input_config.sample_rate(),
            buffer_size: cpal::BufferSize::Fixed(FrameCount::from(INPUT_CHUNK_SIZE as u32)),
        };
        let input_rate = input_config.sample_rate.0 as f64;
        let input_channels = input_config.channels as usize;

        let (frame_tx, mut frame_rx) = mpsc::channel::<Vec<f32>>(64);
        let input_level = meter.input();
        let input_stream = input_device
            .build_input_stream(
                &input_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    input_level.store(meter::frame_level(data));
                    if frame_tx.try_send(data.to_vec()).is_err() {
                        tracing::warn!("dropping microphone frame, channel full");
                    }
                },
                move |err| tracing::error!("live input stream error: {err}"),
                None,
            )
            .context("failed to build live input stream; check microphone permissions")?;
        input_stream
            .play()
            .context("failed to start live input stream")?;

        let wire_tx = client.sender()?;
        let mut encoder = CaptureEncoder::new(input_rate, INPUT_CHUNK_SIZE)?;
        let send_task = tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                if let Some(encoded) = encoder.push(&frame, input_channels) {
                    let chunk = Blob {
                        mime_type: encoded.mime_type.to_string(),
                        data: encoded.data,
                    };
                    if wire_tx
                        .send(afrolearn_live::types::ClientMessage::RealtimeInput(
                            afrolearn_live::types::RealtimeInput {
                                media_chunks: vec![chunk],
                            },
                        ))
                        .await
                        .is_err()
                    {
                        tracing::info!("live send pump gone, stopping capture");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            client,
            meter,
            events_rx,
            _input_stream: input_stream,
            _output_stream: output_stream,
            send_task,
            recv_task,
        })
    }

    pub async fn next_event(&mut self) -> Option<LiveEvent> {
        self.events_rx.recv().await
    }

    pub fn activity(&self) -> Activity {
        self.meter.activity()
    }

    pub fn display_level(&self) -> f32 {
        self.meter.display_level()
    }

    /// Tears everything down: capture stops, queued output is dropped, the
    /// remote handle closes. The session cannot be restarted; open a new
    /// one instead.
    pub fn shutdown(mut self) {
        self.send_task.abort();
        self.recv_task.abort();
        let stats = self.client.stats();
        self.client.close();
        tracing::info!(
            audio_chunks = stats.audio_chunks(),
            interruptions = stats.interruptions(),
            turns = stats.turns(),
            "live session closed"
        );
        // The streams and ring buffer drop with `self`.
    }
}
