//! Reduces a block of audio samples to a single loudness value.
//!
//! Runs inside the audio callback, so nothing here allocates or blocks.

/// Root-mean-square over every sample in the block. An empty block is 0.
pub fn rms<I>(samples: I) -> f32
where
    I: IntoIterator<Item = f32>,
{
    let (sum, count) = samples
        .into_iter()
        .fold((0.0f64, 0usize), |(sum, count), s| {
            (sum + (s as f64) * (s as f64), count + 1)
        });

    if count == 0 {
        return 0.0;
    }

    (sum / count as f64).sqrt() as f32
}

/// Scales the block's RMS energy by `gain` and clamps it into [0, 1].
pub fn loudness<I>(samples: I, gain: f32) -> f32
where
    I: IntoIterator<Item = f32>,
{
    let value = rms(samples) * gain;

    // +inf (overflowing gain) clamps to full scale, only NaN reads as silence
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
