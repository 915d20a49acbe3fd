//! Test signal generators for headphone checks
//!
//! Every generator is a pure function of its numeric inputs and returns a
//! complete buffer ready to be handed to the output stream. Buffers get a short
//! linear fade at both ends so playback starts and stops without a click.

use std::f64::consts::PI;
use std::fmt;

use crate::error::{Result, TesterError};

/// Length of the edge fades
pub const FADE_SECONDS: f64 = 0.01;

/// Sweep start frequency (Hz)
pub const SWEEP_START_HZ: f64 = 20.0;

/// Sweep end frequency (Hz)
pub const SWEEP_END_HZ: f64 = 20000.0;

/// Sweep peak amplitude, leaves headroom
pub const SWEEP_AMPLITUDE: f64 = 0.8;

/// Longest signal the generators will render
pub const MAX_DURATION_SECONDS: f64 = 3600.0;

/// Output channel of a stereo pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left,
    Right,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Left => write!(f, "LEFT"),
            Channel::Right => write!(f, "RIGHT"),
        }
    }
}

/// Interleaved multi-channel sample buffer
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: usize,
    samples: Vec<f32>,
}

impl SampleBuffer {
    /// Place mono columns side by side
    fn from_columns(columns: &[&[f32]]) -> Self {
        let channels = columns.len();
        let frames = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut samples = Vec::with_capacity(frames * channels);
        for frame in 0..frames {
            for column in columns {
                samples.push(column[frame]);
            }
        }
        Self { channels, samples }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Iterate over one channel's column
    pub fn channel(&self, index: usize) -> impl Iterator<Item = f32> + '_ {
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels)
            .copied()
    }

    /// Duration in seconds at the given rate
    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.frames() as f64 / sample_rate as f64
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TesterError::invalid(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}

/// Number of frames for a signal of the given length, at least 2
fn frame_count(duration: f64, sample_rate: u32) -> Result<usize> {
    check_positive("duration", duration)?;
    if duration > MAX_DURATION_SECONDS {
        return Err(TesterError::invalid(format!(
            "duration must be at most {}s, got {}",
            MAX_DURATION_SECONDS, duration
        )));
    }
    if sample_rate == 0 {
        return Err(TesterError::invalid("sample rate must be positive"));
    }
    let frames = (sample_rate as f64 * duration).round() as usize;
    if frames < 2 {
        return Err(TesterError::invalid(format!(
            "duration {}s is too short at {} Hz",
            duration, sample_rate
        )));
    }
    Ok(frames)
}

/// Fade length for a buffer, never more than half of it
fn fade_length(sample_rate: u32, frames: usize) -> usize {
    let fade = (sample_rate as f64 * FADE_SECONDS).round() as usize;
    fade.min(frames / 2)
}

/// Apply a linear 0 -> 1 ramp to the head and 1 -> 0 ramp to the tail.
///
/// Ramps include both end points, so the very first and very last samples
/// come out silent.
fn apply_fades(samples: &mut [f32], fade: usize) {
    if fade == 0 {
        return;
    }
    let len = samples.len();
    let steps = (fade.max(2) - 1) as f32;
    for i in 0..fade {
        let gain = if fade == 1 { 0.0 } else { i as f32 / steps };
        samples[i] *= gain;
        samples[len - 1 - i] *= gain;
    }
}

/// Uniform sample times over `[0, duration)`
fn sample_times(frames: usize, duration: f64) -> impl Iterator<Item = f64> {
    (0..frames).map(move |i| duration * i as f64 / frames as f64)
}

/// Faded mono sine tone
pub fn generate_tone(freq: f64, duration: f64, sample_rate: u32) -> Result<Vec<f32>> {
    check_positive("frequency", freq)?;
    let frames = frame_count(duration, sample_rate)?;

    let mut tone: Vec<f32> = sample_times(frames, duration)
        .map(|t| (2.0 * PI * freq * t).sin() as f32)
        .collect();
    apply_fades(&mut tone, fade_length(sample_rate, frames));
    Ok(tone)
}

/// Same tone in both channels
pub fn generate_stereo_tone(freq: f64, duration: f64, sample_rate: u32) -> Result<SampleBuffer> {
    let tone = generate_tone(freq, duration, sample_rate)?;
    Ok(SampleBuffer::from_columns(&[tone.as_slice(), tone.as_slice()]))
}

/// Tone in one channel only, the other channel silent
pub fn generate_panned_tone(
    freq: f64,
    duration: f64,
    sample_rate: u32,
    channel: Channel,
) -> Result<SampleBuffer> {
    let tone = generate_tone(freq, duration, sample_rate)?;
    let silence = vec![0.0f32; tone.len()];
    let columns: [&[f32]; 2] = match channel {
        Channel::Left => [&tone, &silence],
        Channel::Right => [&silence, &tone],
    };
    Ok(SampleBuffer::from_columns(&columns))
}

/// Logarithmic sweep from 20 Hz to 20 kHz over `duration`, duplicated to stereo.
///
/// Phase is the closed-form integral of the exponential frequency ramp, so it
/// stays continuous across the whole sweep.
pub fn generate_sweep(duration: f64, sample_rate: u32) -> Result<SampleBuffer> {
    let frames = frame_count(duration, sample_rate)?;

    let ratio_ln = (SWEEP_END_HZ / SWEEP_START_HZ).ln();
    let scale = 2.0 * PI * SWEEP_START_HZ * duration / ratio_ln;

    let mut sweep: Vec<f32> = sample_times(frames, duration)
        .map(|t| {
            let phase = scale * ((t / duration * ratio_ln).exp() - 1.0);
            (SWEEP_AMPLITUDE * phase.sin()) as f32
        })
        .collect();
    apply_fades(&mut sweep, fade_length(sample_rate, frames));

    Ok(SampleBuffer::from_columns(&[sweep.as_slice(), sweep.as_slice()]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 48000;

    fn unfaded(freq: f64, duration: f64, frames: usize, i: usize) -> f32 {
        let t = duration * i as f64 / frames as f64;
        (2.0 * PI * freq * t).sin() as f32
    }

    #[test]
    fn test_tone_length_and_fades() {
        let duration = 0.5;
        let tone = generate_tone(440.0, duration, RATE).unwrap();
        assert_eq!(tone.len(), 24000);

        let fade = fade_length(RATE, tone.len());
        assert_eq!(fade, 480);

        assert_eq!(tone[0], 0.0);
        assert_eq!(tone[tone.len() - 1], 0.0);
        for i in 0..fade {
            let raw = unfaded(440.0, duration, tone.len(), i);
            assert!(tone[i].abs() <= raw.abs() + 1e-6);
        }

        for i in fade..tone.len() - fade {
            let raw = unfaded(440.0, duration, tone.len(), i);
            assert!((tone[i] - raw).abs() < 1e-5, "sample {} differs", i);
        }
    }

    #[test]
    fn test_tone_length_rounds() {
        let tone = generate_tone(1000.0, 0.10001, 44100).unwrap();
        assert_eq!(tone.len(), (44100.0f64 * 0.10001).round() as usize);
    }

    #[test]
    fn test_short_buffer_clamps_fade() {
        // 5 frames, the 10 ms fade would be 480 frames
        let tone = generate_tone(1000.0, 5.0 / RATE as f64, RATE).unwrap();
        assert_eq!(tone.len(), 5);
        assert_eq!(fade_length(RATE, tone.len()), 2);
        assert!(tone.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_too_short_is_rejected() {
        let err = generate_tone(440.0, 1.0 / RATE as f64, RATE).unwrap_err();
        assert!(matches!(err, TesterError::InvalidParameter(_)));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(generate_tone(0.0, 1.0, RATE).is_err());
        assert!(generate_tone(-5.0, 1.0, RATE).is_err());
        assert!(generate_tone(440.0, 0.0, RATE).is_err());
        assert!(generate_tone(440.0, -1.0, RATE).is_err());
        assert!(generate_tone(440.0, f64::NAN, RATE).is_err());
        assert!(generate_tone(440.0, 1.0, 0).is_err());
        assert!(generate_sweep(0.0, RATE).is_err());
        assert!(generate_sweep(1.0, 0).is_err());
    }

    #[test]
    fn test_stereo_tone_duplicates_channels() {
        let stereo = generate_stereo_tone(440.0, 0.1, RATE).unwrap();
        assert_eq!(stereo.channels(), 2);
        assert_eq!(stereo.frames(), 4800);
        let left: Vec<f32> = stereo.channel(0).collect();
        let right: Vec<f32> = stereo.channel(1).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_panned_tone_left() {
        let buf = generate_panned_tone(440.0, 0.2, RATE, Channel::Left).unwrap();
        assert!(buf.channel(1).all(|s| s == 0.0));
        assert!(buf.channel(0).any(|s| s.abs() > 0.5));
    }

    #[test]
    fn test_panned_tone_right() {
        let buf = generate_panned_tone(440.0, 0.2, RATE, Channel::Right).unwrap();
        assert!(buf.channel(0).all(|s| s == 0.0));
        assert!(buf.channel(1).any(|s| s.abs() > 0.5));
    }

    #[test]
    fn test_huge_duration_is_rejected() {
        let err = generate_tone(440.0, 1e12, RATE).unwrap_err();
        assert!(matches!(err, TesterError::InvalidParameter(_)));
        assert!(generate_sweep(MAX_DURATION_SECONDS * 2.0, RATE).is_err());
        assert!(generate_panned_tone(440.0, f64::MAX, RATE, Channel::Left).is_err());
    }

    #[test]
    fn test_channel_display() {
        assert_eq!(Channel::Left.to_string(), "LEFT");
        assert_eq!(Channel::Right.to_string(), "RIGHT");
    }

    /// Zero-crossing frequency estimate over `[start, end)` of a mono column
    fn crossing_freq(column: &[f32], start: usize, end: usize) -> f64 {
        let crossings = column[start..end]
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        let seconds = (end - start) as f64 / RATE as f64;
        crossings as f64 / (2.0 * seconds)
    }

    #[test]
    fn test_sweep_frequency_rises() {
        let duration = 10.0;
        let sweep = generate_sweep(duration, RATE).unwrap();
        let column: Vec<f32> = sweep.channel(0).collect();
        assert_eq!(column.len(), 480000);

        let window = RATE as usize / 2;
        let estimates: Vec<f64> = (0..column.len() / window)
            .map(|w| crossing_freq(&column, w * window, (w + 1) * window))
            .collect();
        for pair in estimates.windows(2) {
            assert!(pair[1] > pair[0], "{:?}", estimates);
        }

        let head = crossing_freq(&column, 0, window);
        assert!(head > 15.0 && head < 30.0, "head {}", head);

        let tail_len = RATE as usize / 20;
        let tail = crossing_freq(&column, column.len() - tail_len, column.len());
        assert!(tail > 18000.0 && tail < 20500.0, "tail {}", tail);
    }

    #[test]
    fn test_sweep_amplitude_and_channels() {
        let sweep = generate_sweep(1.0, RATE).unwrap();
        assert_eq!(sweep.channels(), 2);
        assert!(sweep.samples().iter().all(|s| s.abs() <= 0.8 + 1e-6));
        let left: Vec<f32> = sweep.channel(0).collect();
        let right: Vec<f32> = sweep.channel(1).collect();
        assert_eq!(left, right);
        assert_eq!(left[0], 0.0);
        assert_eq!(left[left.len() - 1], 0.0);
    }

    #[test]
    fn test_buffer_duration() {
        let buf = generate_stereo_tone(440.0, 0.25, RATE).unwrap();
        assert_eq!(buf.frames(), 12000);
        assert!((buf.duration_secs(RATE) - 0.25).abs() < 1e-9);
    }
}
