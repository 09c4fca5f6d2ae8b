//! Speech synthesis engines.
//!
//! This module contains implementations of text-to-speech engines.
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `gtts` - Google Translate TTS (HTTP, MP3 output, enabled by default)
//! - `espeak` - local espeak-ng binary (WAV output)

#[cfg(feature = "espeak")]
pub mod espeak;
#[cfg(feature = "gtts")]
pub mod gtts;
