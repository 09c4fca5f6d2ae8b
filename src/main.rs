use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};

use tts_deck::{run, DeckConfig, DeckConfigBuilder, IdStrategy, MissingAudio, RunSummary};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Engine {
    /// Google Translate TTS (needs network)
    Gtts,
    /// Local espeak-ng binary
    Espeak,
}

/// Build an Anki deck with pronunciation audio from a vocabulary list.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON vocabulary list
    #[arg(long, default_value = "vocabulary.json")]
    input: PathBuf,
    /// Directory for cached audio clips
    #[arg(long, default_value = "tts")]
    media_dir: PathBuf,
    /// Package file to write
    #[arg(long, default_value = "JLPT_N5_Vocab_All.apkg")]
    output: PathBuf,
    #[arg(long, default_value = "JLPT_N5_Vocab")]
    deck_name: String,
    #[arg(long, default_value = "JLPT_N5_Model")]
    model_name: String,
    /// Language code spoken by the engine
    #[arg(long, default_value = "ja")]
    language: String,
    #[arg(long, value_enum, default_value_t = Engine::Gtts)]
    engine: Engine,
    /// Slower speech (gtts only)
    #[arg(long)]
    slow: bool,
    /// Derive deck and note type ids from their names instead of randomizing them
    #[arg(long)]
    stable_ids: bool,
    /// Keep records whose audio failed, without audio
    #[arg(long)]
    keep_without_audio: bool,
}

impl Cli {
    fn config(&self) -> Result<DeckConfig, tts_deck::DeckError> {
        DeckConfigBuilder::default()
            .input(self.input.clone())
            .media_dir(self.media_dir.clone())
            .output(self.output.clone())
            .deck_name(self.deck_name.clone())
            .model_name(self.model_name.clone())
            .language(self.language.clone())
            .ids(if self.stable_ids {
                IdStrategy::Stable
            } else {
                IdStrategy::Random
            })
            .missing_audio(if self.keep_without_audio {
                MissingAudio::KeepWithoutAudio
            } else {
                MissingAudio::Drop
            })
            .build()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.config()?;

    let start = Instant::now();
    let summary = build(&cli, &config)?;
    println!(
        "Wrote {} notes ({} cards, {} audio files) to {} in {:.2?}",
        summary.notes,
        summary.package.cards,
        summary.package.media,
        config.output.display(),
        start.elapsed()
    );
    Ok(())
}

fn build(cli: &Cli, config: &DeckConfig) -> Result<RunSummary, Box<dyn std::error::Error>> {
    match cli.engine {
        #[cfg(feature = "gtts")]
        Engine::Gtts => {
            use tts_deck::engines::gtts::{GttsEngine, GttsParams};

            let mut engine = GttsEngine::with_params(GttsParams {
                slow: cli.slow,
                ..Default::default()
            })?;
            Ok(run(config, &mut engine)?)
        }
        #[cfg(feature = "espeak")]
        Engine::Espeak => {
            let mut engine = tts_deck::engines::espeak::EspeakEngine::new();
            Ok(run(config, &mut engine)?)
        }
        #[allow(unreachable_patterns)]
        other => Err(format!(
            "engine {other:?} is not compiled in; rebuild with `--features {}`",
            format!("{other:?}").to_lowercase()
        )
        .into()),
    }
}
