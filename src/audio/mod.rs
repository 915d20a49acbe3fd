//! Audio engine for the tester
//!
//! Provides:
//! - Test signal generation (tones, panned tones, log sweep)
//! - Input level metering
//! - Mic-to-headphone loopback
//! - Device enumeration and selection by index or type

pub mod device;
pub mod engine;
pub mod host;
pub mod input;
pub mod loopback;
pub mod meter;
pub mod mixer;
pub mod selector;
pub mod signals;
