use std::path::PathBuf;

use derive_builder::Builder;

pub use crate::deck::IdStrategy;
use crate::error::DeckError;

/// What to do with a record whose audio could not be produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingAudio {
    /// Leave the record out of the deck.
    #[default]
    Drop,
    /// Keep the note with an empty `Audio` field.
    KeepWithoutAudio,
}

/// Settings for one deck build.
///
/// Defaults reproduce the N5 vocabulary deck:
///
/// ```rust
/// use tts_deck::{DeckConfigBuilder, MissingAudio};
///
/// let config = DeckConfigBuilder::default()
///     .input("n4.json")
///     .deck_name("JLPT_N4_Vocab")
///     .missing_audio(MissingAudio::KeepWithoutAudio)
///     .build()?;
/// assert_eq!(config.language, "ja");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), default, build_fn(error = "DeckError"))]
pub struct DeckConfig {
    /// JSON vocabulary list.
    pub input: PathBuf,
    /// Directory holding the cached `word_{i}` clips.
    pub media_dir: PathBuf,
    /// Package file to write.
    pub output: PathBuf,
    pub deck_name: String,
    pub model_name: String,
    /// Language code handed to the speech engine.
    pub language: String,
    pub ids: IdStrategy,
    pub missing_audio: MissingAudio,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("vocabulary.json"),
            media_dir: PathBuf::from("tts"),
            output: PathBuf::from("JLPT_N5_Vocab_All.apkg"),
            deck_name: "JLPT_N5_Vocab".to_string(),
            model_name: "JLPT_N5_Model".to_string(),
            language: "ja".to_string(),
            ids: IdStrategy::Random,
            missing_audio: MissingAudio::Drop,
        }
    }
}

impl From<derive_builder::UninitializedFieldError> for DeckError {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        DeckError::Config(e.to_string())
    }
}

impl DeckConfig {
    pub fn validate(&self) -> Result<(), DeckError> {
        if self.deck_name.trim().is_empty() {
            return Err(DeckError::Config("deck name is empty".to_string()));
        }
        if self.model_name.trim().is_empty() {
            return Err(DeckError::Config("note type name is empty".to_string()));
        }
        if self.language.trim().is_empty() {
            return Err(DeckError::Config("language code is empty".to_string()));
        }
        Ok(())
    }
}
