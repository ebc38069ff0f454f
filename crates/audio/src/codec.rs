use base64::Engine;

/// Sample rate of microphone audio on the wire.
pub const INPUT_SAMPLE_RATE: f64 = 16_000.0;
/// Sample rate of synthesized audio coming back.
pub const OUTPUT_SAMPLE_RATE: f64 = 24_000.0;
/// MIME descriptor attached to every outgoing microphone frame.
pub const INPUT_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Decodes a base64 fragment of little-endian PCM16 into normalized f32
/// samples. A fragment that fails to decode yields an empty buffer; an odd
/// trailing byte is ignored.
pub fn decode(fragment: &str) -> Vec<f32> {
    match base64::engine::general_purpose::STANDARD.decode(fragment) {
        Ok(pcm16) => decode_bytes(&pcm16),
        Err(_) => {
            tracing::error!("failed to decode base64 audio fragment");
            Vec::new()
        }
    }
}

pub fn decode_bytes(pcm16: &[u8]) -> Vec<f32> {
    pcm16
        .chunks_exact(2)
        .map(|chunk| {
            let v = i16::from_le_bytes([chunk[0], chunk[1]]);
            (v as f32 / 32768.0).clamp(-1.0, 1.0)
        })
        .collect()
}

/// Encodes f32 samples as base64 little-endian PCM16. Out-of-range samples
/// are clamped to the i16 range rather than wrapped.
pub fn encode(samples: &[f32]) -> String {
    let pcm16: Vec<u8> = samples
        .iter()
        .flat_map(|&sample| {
            let v = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            v.to_le_bytes()
        })
        .collect();
    base64::engine::general_purpose::STANDARD.encode(&pcm16)
}

/// Playback length of a mono sample buffer at the given rate.
pub fn duration_secs(sample_count: usize, sample_rate: f64) -> f64 {
    sample_count as f64 / sample_rate
}
