//! # tts-deck
//!
//! Turns a vocabulary list into an Anki flashcard package, with a synthesized
//! pronunciation clip attached to every entry.
//!
//! ## Features
//!
//! - **Bidirectional cards**: every note yields a term → meaning and a
//!   meaning → term card
//! - **Resumable audio cache**: clips already on disk are reused, so an
//!   interrupted batch can simply be re-run
//! - **Pluggable speech engines**: Google Translate TTS (`gtts`, default) or a
//!   local espeak-ng install (`espeak`)
//! - **Self-contained output**: one `.apkg` holding the collection and all
//!   audio, importable by Anki desktop and mobile
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! tts-deck = { version = "2026.10", features = ["gtts"] }
//! ```
//!
//! ```ignore
//! use tts_deck::{engines::gtts::GttsEngine, run, DeckConfig};
//!
//! let config = DeckConfig::default();
//! let mut engine = GttsEngine::new()?;
//! let summary = run(&config, &mut engine)?;
//! println!("{} notes written", summary.notes);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio_cache;
pub mod config;
pub mod deck;
pub mod engines;
pub mod error;
pub mod package;
pub mod pipeline;
pub mod template;
pub mod vocab;

use std::fs;
use std::path::Path;

pub use config::{DeckConfig, DeckConfigBuilder, IdStrategy, MissingAudio};
pub use error::{DeckError, SynthesisError};
pub use pipeline::{run, Pipeline, RunSummary};

/// Container format of a synthesized clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    /// File extension used for cached clips, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }
}

/// The result of a synthesis (text-to-speech) operation.
///
/// Local engines hand back raw samples; remote services hand back an
/// already-encoded file.
#[derive(Debug)]
pub enum SynthesisResult {
    /// Raw f32 samples at the given sample rate.
    Pcm { samples: Vec<f32>, sample_rate: u32 },
    /// Encoded audio, written to disk as-is.
    Encoded { bytes: Vec<u8>, format: AudioFormat },
}

impl SynthesisResult {
    pub fn format(&self) -> AudioFormat {
        match self {
            SynthesisResult::Pcm { .. } => AudioFormat::Wav,
            SynthesisResult::Encoded { format, .. } => *format,
        }
    }

    /// Write the clip to `path`. PCM becomes a 32-bit float WAV file.
    pub fn write(&self, path: &Path) -> Result<(), SynthesisError> {
        match self {
            SynthesisResult::Pcm {
                samples,
                sample_rate,
            } => write_wav(path, samples, *sample_rate),
            SynthesisResult::Encoded { bytes, .. } => {
                fs::write(path, bytes)?;
                Ok(())
            }
        }
    }

    /// Duration of the audio in seconds, when it is known without decoding.
    pub fn duration_secs(&self) -> Option<f64> {
        match self {
            SynthesisResult::Pcm {
                samples,
                sample_rate,
            } if *sample_rate > 0 => Some(samples.len() as f64 / *sample_rate as f64),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SynthesisResult::Pcm { samples, .. } => samples.is_empty(),
            SynthesisResult::Encoded { bytes, .. } => bytes.is_empty(),
        }
    }
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), SynthesisError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Common interface for text-to-speech synthesis engines.
///
/// The deck pipeline only needs "text + language in, one clip out"; each
/// engine may carry its own tuning knobs through `SynthesisParams`.
pub trait SynthesisEngine {
    /// Parameters for configuring a single request (speed, voice, etc.)
    type SynthesisParams: Default;

    /// Format of the clips this engine produces. Decides the cache file extension.
    fn output_format(&self) -> AudioFormat;

    /// Synthesize speech for `text` spoken in `language` (e.g. `"ja"`).
    ///
    /// `None` uses the engine's configured parameters.
    fn synthesize(
        &mut self,
        text: &str,
        language: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, SynthesisError>;

    /// Synthesize speech and write it to `path`.
    ///
    /// Default implementation calls `synthesize()` then `SynthesisResult::write()`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        language: &str,
        path: &Path,
        params: Option<Self::SynthesisParams>,
    ) -> Result<(), SynthesisError> {
        self.synthesize(text, language, params)?.write(path)
    }
}
