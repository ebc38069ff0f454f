use std::io::Cursor;

use crate::capture::mix_to_mono;
use crate::resample::MonoResampler;

/// MIME type of a finalized recording.
pub const TRANSCRIPTION_MIME_TYPE: &str = "audio/wav";

const WAV_SAMPLE_RATE: u32 = 16_000;
const RESAMPLER_CHUNK: usize = 1024;

/// Accumulates microphone audio for the transcription endpoint and
/// finalizes it into an in-memory mono 16 kHz WAV.
pub struct WavRecorder {
    resampler: MonoResampler,
    samples: Vec<i16>,
}

impl WavRecorder {
    pub fn new(device_rate: f64) -> anyhow::Result<Self> {
        Ok(Self {
            resampler: MonoResampler::new(device_rate, WAV_SAMPLE_RATE as f64, RESAMPLER_CHUNK)?,
            samples: Vec::new(),
        })
    }

    pub fn push(&mut self, data: &[f32], channels: usize) {
        let mono = mix_to_mono(data, channels);
        for sample in self.resampler.push(&mono) {
            self.samples.push(quantize(sample));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / WAV_SAMPLE_RATE as f64
    }

    /// Flushes the resampler tail and writes the WAV container.
    pub fn finalize(mut self) -> anyhow::Result<Vec<u8>> {
        for sample in self.resampler.flush() {
            self.samples.push(quantize(sample));
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: WAV_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for sample in &self.samples {
                writer.write_sample(*sample)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }
}

fn quantize(sample: f32) -> i16 {
    (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
