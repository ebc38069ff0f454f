use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Fixed-ratio mono resampler between a device rate and a wire rate.
pub fn create_resampler(
    in_rate: f64,
    out_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_rate / in_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Feeds arbitrarily sized sample runs through a fixed-chunk resampler,
/// buffering the remainder between calls so no samples are dropped at
/// chunk boundaries.
pub struct MonoResampler {
    resampler: FastFixedIn<f32>,
    chunk_size: usize,
    pending: Vec<f32>,
}

impl MonoResampler {
    pub fn new(in_rate: f64, out_rate: f64, chunk_size: usize) -> anyhow::Result<Self> {
        Ok(Self {
            resampler: create_resampler(in_rate, out_rate, chunk_size)?,
            chunk_size,
            pending: Vec::with_capacity(chunk_size * 2),
        })
    }

    /// Appends samples and returns whatever full chunks resampled to.
    pub fn push(&mut self, samples: &[f32]) -> Vec<f32> {
        self.pending.extend_from_slice(samples);
        let mut out = Vec::new();
        while self.pending.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.pending.drain(..self.chunk_size).collect();
            match self.resampler.process(&[chunk.as_slice()], None) {
                Ok(mut resampled) => {
                    if let Some(channel) = resampled.pop() {
                        out.extend(channel);
                    }
                }
                Err(e) => {
                    tracing::error!("resampling failed: {e}");
                }
            }
        }
        out
    }

    /// Pads and flushes the buffered remainder. Call once at end of a
    /// recording; the pad is silence.
    pub fn flush(&mut self) -> Vec<f32> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        self.pending.resize(self.chunk_size, 0.0);
        let chunk: Vec<f32> = self.pending.drain(..).collect();
        match self.resampler.process(&[chunk.as_slice()], None) {
            Ok(mut resampled) => resampled.pop().unwrap_or_default(),
            Err(e) => {
                tracing::error!("resampling failed: {e}");
                Vec::new()
            }
        }
    }
}

/// Splits a decoded buffer into fixed-size chunks, zero-padding the last
/// one to the chunk size.
pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_ratio_passes_samples_through() {
        let mut r = MonoResampler::new(16_000.0, 16_000.0, 64).unwrap();
        let input: Vec<f32> = (0..128).map(|i| (i as f32 / 128.0).sin()).collect();
        let out = r.push(&input);
        assert_eq!(out.len(), 128);
    }

    #[test]
    fn partial_chunks_are_buffered_between_calls() {
        let mut r = MonoResampler::new(16_000.0, 16_000.0, 64).unwrap();
        assert!(r.push(&[0.1; 40]).is_empty());
        let out = r.push(&[0.1; 40]);
        assert_eq!(out.len(), 64);
        // 16 samples still pending.
        let tail = r.flush();
        assert_eq!(tail.len(), 64);
    }

    #[test]
    fn split_pads_the_final_chunk() {
        let chunks = split_for_chunks(&[1.0; 100], 64);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 64);
        assert_eq!(chunks[1].len(), 64);
        assert_eq!(chunks[1][35], 1.0);
        assert_eq!(chunks[1][36], 0.0);
    }
}
