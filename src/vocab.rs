use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use crate::error::DeckError;

/// One vocabulary entry.
///
/// Every field is optional in the input and falls back to an empty string.
/// Keys the deck does not use (`id`, `chineseMeaning`, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VocabRecord {
    /// Source-language term; this is what gets spoken.
    pub japanese: String,
    pub reading: String,
    /// Target-language gloss.
    pub english: String,
    pub part_of_speech: String,
    #[serde(rename = "exampleSentenceJapanese")]
    pub example_japanese: String,
    #[serde(rename = "exampleSentenceEnglish")]
    pub example_translation: String,
    pub jlpt_level: String,
}

/// Load the vocabulary list from a JSON file holding an array of records.
pub fn load_vocabulary(path: &Path) -> Result<Vec<VocabRecord>, DeckError> {
    let file = File::open(path).map_err(|source| DeckError::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    let records = load_vocabulary_from_reader(BufReader::new(file))?;
    log::info!(
        "Loaded {} vocabulary records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

pub fn load_vocabulary_from_reader<R: Read>(reader: R) -> Result<Vec<VocabRecord>, DeckError> {
    serde_json::from_reader(reader).map_err(DeckError::ParseInput)
}
