use crate::codec::{self, INPUT_MIME_TYPE, INPUT_SAMPLE_RATE};
use crate::resample::MonoResampler;

/// One encoded microphone frame ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub mime_type: &'static str,
    pub data: String,
}

/// Averages interleaved channels down to mono. Mono input passes through.
pub fn mix_to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Turns raw device callback buffers into 16 kHz PCM16 wire frames. Frames
/// go out as soon as a resampler chunk fills; there is no batching and no
/// backpressure here.
pub struct CaptureEncoder {
    resampler: MonoResampler,
}

impl CaptureEncoder {
    pub fn new(device_rate: f64, chunk_size: usize) -> anyhow::Result<Self> {
        Ok(Self {
            resampler: MonoResampler::new(device_rate, INPUT_SAMPLE_RATE, chunk_size)?,
        })
    }

    /// Feeds one device buffer; returns an encoded frame once enough
    /// samples have accumulated, `None` otherwise.
    pub fn push(&mut self, data: &[f32], channels: usize) -> Option<AudioFrame> {
        let mono = mix_to_mono(data, channels);
        let resampled = self.resampler.push(&mono);
        if resampled.is_empty() {
            return None;
        }
        Some(AudioFrame {
            mime_type: INPUT_MIME_TYPE,
            data: codec::encode(&resampled),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_mixes_by_channel_average() {
        let mixed = mix_to_mono(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2);
        assert_eq!(mixed, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn mono_passes_through_unchanged() {
        let mixed = mix_to_mono(&[0.1, 0.2, 0.3], 1);
        assert_eq!(mixed, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn frames_carry_the_fixed_mime_descriptor() {
        let mut enc = CaptureEncoder::new(16_000.0, 64).unwrap();
        assert!(enc.push(&[0.1; 32], 1).is_none());
        let frame = enc.push(&[0.1; 32], 1).expect("chunk filled");
        assert_eq!(frame.mime_type, "audio/pcm;rate=16000");
        assert_eq!(codec::decode(&frame.data).len(), 64);
    }
}
