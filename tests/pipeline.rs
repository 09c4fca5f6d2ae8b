use std::fs;
use std::path::Path;

use tts_deck::package::read_package;
use tts_deck::{
    run, AudioFormat, DeckConfig, DeckConfigBuilder, IdStrategy, SynthesisEngine,
    SynthesisError, SynthesisResult,
};

/// In-memory engine that records every request and fails on chosen terms.
#[derive(Default)]
struct ScriptedEngine {
    calls: Vec<String>,
    fail_on: Vec<String>,
}

impl ScriptedEngine {
    fn failing_on(term: &str) -> Self {
        Self {
            fail_on: vec![term.to_string()],
            ..Default::default()
        }
    }
}

impl SynthesisEngine for ScriptedEngine {
    type SynthesisParams = ();

    fn output_format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn synthesize(
        &mut self,
        text: &str,
        language: &str,
        _params: Option<()>,
    ) -> Result<SynthesisResult, SynthesisError> {
        assert_eq!(language, "ja");
        self.calls.push(text.to_string());
        if self.fail_on.iter().any(|t| t == text) {
            return Err(SynthesisError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(SynthesisResult::Encoded {
            bytes: format!("audio for {text}").into_bytes(),
            format: AudioFormat::Mp3,
        })
    }
}

const THREE_WORDS: &str = r#"[
  {"japanese": "水", "reading": "みず", "english": "water", "partOfSpeech": "noun",
   "exampleSentenceJapanese": "水を飲みます。", "exampleSentenceEnglish": "I drink water.", "jlptLevel": "N5"},
  {"japanese": "火", "reading": "ひ", "english": "fire", "partOfSpeech": "noun",
   "exampleSentenceJapanese": "火が強い。", "exampleSentenceEnglish": "The fire is strong.", "jlptLevel": "N5"},
  {"japanese": "木", "reading": "き", "english": "tree", "partOfSpeech": "noun",
   "exampleSentenceJapanese": "木があります。", "exampleSentenceEnglish": "There is a tree.", "jlptLevel": "N5"}
]"#;

fn config_in(dir: &Path, vocabulary: &str) -> DeckConfig {
    let input = dir.join("vocabulary.json");
    fs::write(&input, vocabulary).unwrap();
    DeckConfigBuilder::default()
        .input(input)
        .media_dir(dir.join("tts"))
        .output(dir.join("JLPT_N5_Vocab_All.apkg"))
        .build()
        .unwrap()
}

#[test]
fn every_record_becomes_a_note_with_audio() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), THREE_WORDS);
    let mut engine = ScriptedEngine::default();

    let summary = run(&config, &mut engine).unwrap();
    assert_eq!(summary.records, 3);
    assert_eq!(summary.notes, 3);
    assert_eq!(summary.synthesized, 3);

    let contents = read_package(&config.output).unwrap();
    assert_eq!(contents.notes.len(), 3);
    assert_eq!(contents.media.len(), 3);
    assert_eq!(contents.cards, 6);
    assert_eq!(contents.deck_name, "JLPT_N5_Vocab");
    assert_eq!(
        contents.notes[1],
        vec![
            "火",
            "ひ",
            "fire",
            "noun",
            "火が強い。",
            "The fire is strong.",
            "N5",
            "[sound:word_1.mp3]"
        ]
    );
    let names: Vec<&str> = contents.media.values().map(String::as_str).collect();
    assert_eq!(names, vec!["word_0.mp3", "word_1.mp3", "word_2.mp3"]);
}

#[test]
fn failed_synthesis_drops_only_that_record() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), THREE_WORDS);
    let mut engine = ScriptedEngine::failing_on("火");

    let summary = run(&config, &mut engine).unwrap();
    assert_eq!(summary.notes, 2);
    assert_eq!(summary.skipped, 1);

    let contents = read_package(&config.output).unwrap();
    let terms: Vec<&str> = contents.notes.iter().map(|n| n[0].as_str()).collect();
    assert_eq!(terms, vec!["水", "木"]);
    let names: Vec<&str> = contents.media.values().map(String::as_str).collect();
    assert_eq!(names, vec!["word_0.mp3", "word_2.mp3"]);
    assert!(!dir.path().join("tts").join("word_1.mp3").exists());
}

#[test]
fn rerun_reuses_cached_clips() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), THREE_WORDS);

    let mut first = ScriptedEngine::failing_on("火");
    run(&config, &mut first).unwrap();
    assert_eq!(first.calls.len(), 3);

    // Only the clip that failed last time is requested again.
    let mut second = ScriptedEngine::default();
    let summary = run(&config, &mut second).unwrap();
    assert_eq!(second.calls, vec!["火"]);
    assert_eq!(summary.cached, 2);
    assert_eq!(summary.synthesized, 1);
    assert_eq!(summary.notes, 3);

    let mut third = ScriptedEngine::default();
    run(&config, &mut third).unwrap();
    assert!(third.calls.is_empty());
}

#[test]
fn empty_term_still_produces_a_note() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), r#"[{"english": "(blank)"}, {"japanese": "水"}]"#);
    let mut engine = ScriptedEngine::default();

    let summary = run(&config, &mut engine).unwrap();
    assert_eq!(summary.notes, 2);
    assert_eq!(engine.calls, vec!["", "水"]);

    let contents = read_package(&config.output).unwrap();
    assert_eq!(contents.notes[0][0], "");
    assert_eq!(contents.notes[0][2], "(blank)");
}

#[test]
fn ids_are_random_per_run_unless_stable() {
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();
    let first = config_in(first_dir.path(), THREE_WORDS);
    let second = config_in(second_dir.path(), THREE_WORDS);

    let a = run(&first, &mut ScriptedEngine::default()).unwrap();
    let b = run(&second, &mut ScriptedEngine::default()).unwrap();

    let notes_a = read_package(&first.output).unwrap().notes;
    let notes_b = read_package(&second.output).unwrap().notes;
    assert_eq!(notes_a, notes_b);
    // Random ids come from a 2^30-wide range; a collision on both is not a realistic outcome.
    assert!(a.deck_id != b.deck_id || a.model_id != b.model_id);

    let stable = DeckConfig {
        ids: IdStrategy::Stable,
        ..first.clone()
    };
    let c = run(&stable, &mut ScriptedEngine::default()).unwrap();
    let d = run(&stable, &mut ScriptedEngine::default()).unwrap();
    assert_eq!((c.deck_id, c.model_id), (d.deck_id, d.model_id));
    assert_eq!(read_package(&stable.output).unwrap().deck_id, d.deck_id);
}

#[test]
fn malformed_input_aborts_before_any_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), "not json");
    let mut engine = ScriptedEngine::default();

    assert!(run(&config, &mut engine).is_err());
    assert!(engine.calls.is_empty());
    assert!(!config.output.exists());
}
