use std::path::PathBuf;

/// Failure to produce the audio clip of a single record.
///
/// These are recoverable: the run logs them and moves on to the next record.
#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[cfg(feature = "gtts")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("TTS service answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("TTS service returned no audio")]
    EmptyResponse,
    #[error("Nothing to synthesize: text is empty")]
    EmptyText,
    #[error(
        "espeak-ng not found. Install: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
    )]
    EspeakNotFound,
    #[error("espeak-ng failed: {0}")]
    EspeakFailed(String),
}

/// Run-level failure. Any of these aborts the run.
#[derive(thiserror::Error, Debug)]
pub enum DeckError {
    #[error("Failed to read vocabulary file {}: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse vocabulary list: {0}")]
    ParseInput(#[source] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Media file missing: {}", .0.display())]
    MissingMedia(PathBuf),
    #[error("Invalid configuration: {0}")]
    Config(String),
}
