//! Interactive headphone and audio interface tester
//!
//! Plays test signals, meters the microphone and loops the microphone back
//! to the headphones, on devices chosen by index or by type (USB or line).

pub mod audio;
pub mod cancel;
pub mod commands;
pub mod config;
pub mod error;
pub mod session;

#[cfg(test)]
mod testing;
