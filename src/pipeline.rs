use std::path::PathBuf;

use crate::audio_cache::{AudioCache, ClipSource};
use crate::config::{DeckConfig, MissingAudio};
use crate::deck::{Deck, Note};
use crate::error::DeckError;
use crate::package::{write_package, PackageStats};
use crate::template::NoteModel;
use crate::vocab::{load_vocabulary, VocabRecord};
use crate::SynthesisEngine;

/// Outcome of a deck build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records read from the input.
    pub records: usize,
    /// Notes written to the package.
    pub notes: usize,
    /// Clips produced by the engine during this run.
    pub synthesized: usize,
    /// Clips reused from the cache directory.
    pub cached: usize,
    /// Records whose audio failed.
    pub skipped: usize,
    pub deck_id: i64,
    pub model_id: i64,
    pub package: PackageStats,
}

/// One deck build: the loaded records, the note type and the deck being filled.
pub struct Pipeline<'a> {
    config: &'a DeckConfig,
    records: Vec<VocabRecord>,
    model: NoteModel,
    deck: Deck,
    cache: AudioCache,
    media: Vec<PathBuf>,
    summary: RunSummary,
}

impl<'a> Pipeline<'a> {
    /// Load the vocabulary and set up the note type, deck and audio cache.
    pub fn prepare(
        config: &'a DeckConfig,
        engine: &impl SynthesisEngine,
    ) -> Result<Self, DeckError> {
        config.validate()?;
        let records = load_vocabulary(&config.input)?;
        Self::with_records(config, records, engine)
    }

    /// Like [`Pipeline::prepare`] with records already in memory.
    pub fn with_records(
        config: &'a DeckConfig,
        records: Vec<VocabRecord>,
        engine: &impl SynthesisEngine,
    ) -> Result<Self, DeckError> {
        let model_id = config.ids.id_for(&config.model_name);
        let model = NoteModel::vocabulary(model_id, &config.model_name);
        let deck = Deck::new(config.ids.id_for(&config.deck_name), &config.deck_name);
        let cache = AudioCache::create(&config.media_dir, engine.output_format())?;

        let summary = RunSummary {
            records: records.len(),
            deck_id: deck.id,
            model_id: model.id,
            ..Default::default()
        };
        Ok(Self {
            config,
            records,
            model,
            deck,
            cache,
            media: Vec::new(),
            summary,
        })
    }

    /// Fetch or synthesize every clip and build one note per record, in input order.
    pub fn process<E: SynthesisEngine>(&mut self, engine: &mut E) {
        for (index, record) in self.records.iter().enumerate() {
            let term = &record.japanese;
            match self.cache.fetch(index, term, &self.config.language, engine) {
                Ok(clip) => {
                    match clip.source {
                        ClipSource::Cached => {
                            self.summary.cached += 1;
                            log::info!("Audio already cached, reusing: {term}");
                        }
                        ClipSource::Synthesized => {
                            self.summary.synthesized += 1;
                            log::info!("Generated audio: {term}");
                        }
                    }
                    self.deck.add_note(Note::from_record(record, &clip.sound_tag()));
                    self.media.push(clip.path);
                }
                Err(e) => {
                    self.summary.skipped += 1;
                    match self.config.missing_audio {
                        MissingAudio::Drop => {
                            log::warn!("Skipping {term}, audio generation failed: {e}");
                        }
                        MissingAudio::KeepWithoutAudio => {
                            log::warn!("No audio for {term}, keeping note without it: {e}");
                            self.deck.add_note(Note::from_record(record, ""));
                        }
                    }
                }
            }
        }
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn model(&self) -> &NoteModel {
        &self.model
    }

    /// Write the package and return the run summary.
    pub fn finish(self) -> Result<RunSummary, DeckError> {
        let package = write_package(&self.deck, &self.model, &self.media, &self.config.output)?;
        let summary = RunSummary {
            notes: self.deck.len(),
            package,
            ..self.summary
        };
        log::info!(
            "Done! Generated {} ({} of {} records, {} skipped)",
            self.config.output.display(),
            summary.notes,
            summary.records,
            summary.skipped
        );
        Ok(summary)
    }
}

/// Build the deck described by `config`, using `engine` for missing clips.
pub fn run<E: SynthesisEngine>(
    config: &DeckConfig,
    engine: &mut E,
) -> Result<RunSummary, DeckError> {
    let mut pipeline = Pipeline::prepare(config, &*engine)?;
    pipeline.process(engine);
    pipeline.finish()
}
