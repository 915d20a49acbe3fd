//! RMS level meter
//!
//! The dB computation runs inside the input callback; readings are handed to
//! the main thread through a bounded lock-free queue and only rendered there.

use ringbuf::{traits::*, HeapRb};

use super::host::AudioBlockConsumer;

/// Floor used instead of zero RMS so silence maps to a finite value
pub const SILENCE_FLOOR: f64 = 1e-10;

/// Bottom of the displayed range (dB)
pub const METER_FLOOR_DB: f32 = -60.0;

pub const DEFAULT_BAR_WIDTH: usize = 50;

const FILLED: char = '█';
const EMPTY: char = '░';

/// RMS of one channel of an interleaved block, in dB
pub fn channel_db(block: &[f32], channels: usize, channel: usize) -> f32 {
    let channels = channels.max(1);
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for &sample in block.iter().skip(channel).step_by(channels) {
        sum += (sample as f64) * (sample as f64);
        count += 1;
    }
    let rms = if count == 0 {
        0.0
    } else {
        (sum / count as f64).sqrt()
    };
    (20.0 * rms.max(SILENCE_FLOOR).log10()) as f32
}

/// RMS of a mono block, in dB
pub fn block_to_db(block: &[f32]) -> f32 {
    channel_db(block, 1, 0)
}

/// Map dB onto `0..=bar_width`, clamping to the -60..0 dB window
pub fn db_to_bar_level(db: f32, bar_width: usize) -> usize {
    let clamped = if db.is_nan() {
        METER_FLOOR_DB
    } else {
        db.clamp(METER_FLOOR_DB, 0.0)
    };
    let level = ((clamped - METER_FLOOR_DB) / -METER_FLOOR_DB * bar_width as f32) as usize;
    level.min(bar_width)
}

/// `level` filled glyphs followed by `bar_width - level` empty ones
pub fn render_bar(level: usize, bar_width: usize) -> String {
    let level = level.min(bar_width);
    let mut bar = String::with_capacity(bar_width * FILLED.len_utf8());
    bar.extend(std::iter::repeat(FILLED).take(level));
    bar.extend(std::iter::repeat(EMPTY).take(bar_width - level));
    bar
}

/// One meter line, e.g. `[█████░░░] -12.3 dB`
pub fn format_reading(db: f32, bar_width: usize) -> String {
    let bar = render_bar(db_to_bar_level(db, bar_width), bar_width);
    format!("[{}] {:+6.1} dB", bar, db)
}

/// Real-time side of the meter: computes dB per block and queues it
pub struct LevelMeter {
    channels: usize,
    readings: ringbuf::HeapProd<f32>,
}

/// Main-thread side of the meter
pub struct LevelReadings {
    readings: ringbuf::HeapCons<f32>,
}

impl LevelMeter {
    /// Create a meter for interleaved input with `channels` channels.
    /// Only the first channel is measured. When the queue is full new
    /// readings are dropped; the reader only cares about the latest anyway.
    pub fn new(channels: usize, queue_capacity: usize) -> (Self, LevelReadings) {
        let rb = HeapRb::new(queue_capacity.max(1));
        let (producer, consumer) = rb.split();
        (
            Self {
                channels: channels.max(1),
                readings: producer,
            },
            LevelReadings { readings: consumer },
        )
    }
}

impl AudioBlockConsumer for LevelMeter {
    fn consume(&mut self, input: &[f32]) {
        let db = channel_db(input, self.channels, 0);
        let _ = self.readings.try_push(db);
    }
}

impl LevelReadings {
    /// Pop everything queued and return the newest reading
    pub fn latest(&mut self) -> Option<f32> {
        let mut latest = None;
        while let Some(db) = self.readings.try_pop() {
            latest = Some(db);
        }
        latest
    }
}
