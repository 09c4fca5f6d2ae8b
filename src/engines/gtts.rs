//! Google Translate text-to-speech.
//!
//! Uses the public `translate_tts` endpoint, the same one the web translator
//! plays. It answers with MP3 and accepts at most about 100 characters per
//! request, so longer text is split into chunks whose MP3 streams are
//! concatenated.
//!
//! ```rust,no_run
//! use tts_deck::{SynthesisEngine, engines::gtts::GttsEngine};
//! use std::path::Path;
//!
//! let mut engine = GttsEngine::new()?;
//! engine.synthesize_to_file("水", "ja", Path::new("mizu.mp3"), None)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use crate::{AudioFormat, SynthesisEngine, SynthesisError, SynthesisResult};

/// Longest text (in characters) sent in a single request.
pub const MAX_CHUNK_CHARS: usize = 100;

const DEFAULT_HOST: &str = "https://translate.google.com";

/// Parameters for a Google TTS request.
#[derive(Debug, Clone)]
pub struct GttsParams {
    /// Read more slowly.
    pub slow: bool,
    /// Base URL; override for regional domains or a test server.
    pub host: String,
    /// Attempts per chunk before giving up on transport errors.
    pub max_attempts: usize,
    /// Pause before the second attempt; later attempts wait proportionally longer.
    pub retry_delay: Duration,
}

impl Default for GttsParams {
    fn default() -> Self {
        Self {
            slow: false,
            host: DEFAULT_HOST.to_string(),
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

pub struct GttsEngine {
    client: Client,
    params: GttsParams,
}

impl GttsEngine {
    pub fn new() -> Result<Self, SynthesisError> {
        Self::with_params(GttsParams::default())
    }

    /// Engine whose requests use `params` unless overridden per call.
    pub fn with_params(params: GttsParams) -> Result<Self, SynthesisError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, params })
    }

    fn fetch_chunk(
        &self,
        chunk: &str,
        language: &str,
        params: &GttsParams,
    ) -> Result<Vec<u8>, SynthesisError> {
        let url = format!("{}/translate_tts", params.host.trim_end_matches('/'));
        let speed = if params.slow { "0.3" } else { "1" };
        let attempts = params.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let sent = self
                .client
                .get(&url)
                .header(USER_AGENT, "tts-deck/1.0 (+reqwest)")
                .query(&[
                    ("ie", "UTF-8"),
                    ("q", chunk),
                    ("tl", language),
                    ("client", "tw-ob"),
                    ("ttsspeed", speed),
                ])
                .send();

            let response = match sent {
                Ok(r) => r,
                Err(e) if attempt < attempts => {
                    log::debug!("TTS request failed (attempt {attempt}): {e}");
                    thread::sleep(params.retry_delay * attempt as u32);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(SynthesisError::Status {
                    status: status.as_u16(),
                    body: body.chars().take(200).collect(),
                });
            }

            let bytes = response.bytes()?;
            if bytes.is_empty() {
                return Err(SynthesisError::EmptyResponse);
            }
            return Ok(bytes.to_vec());
        }
    }
}

impl SynthesisEngine for GttsEngine {
    type SynthesisParams = GttsParams;

    fn output_format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn synthesize(
        &mut self,
        text: &str,
        language: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, SynthesisError> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let params = params.unwrap_or_else(|| self.params.clone());
        let mut bytes = Vec::new();
        for chunk in &chunks {
            bytes.extend(self.fetch_chunk(chunk, language, &params)?);
        }

        Ok(SynthesisResult::Encoded {
            bytes,
            format: AudioFormat::Mp3,
        })
    }
}

fn is_break(ch: char) -> bool {
    ch.is_whitespace()
        || matches!(
            ch,
            '.' | ',' | '!' | '?' | ';' | ':' | '。' | '、' | '！' | '？' | '；' | '：' | '…'
        )
}

/// Split `text` into pieces of at most `max_chars` characters, preferring to
/// cut right after whitespace or punctuation. Blank pieces are dropped.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest: Vec<char> = text.trim().chars().collect();

    while rest.len() > max_chars {
        let cut = rest[..max_chars]
            .iter()
            .rposition(|&c| is_break(c))
            .map(|i| i + 1)
            .unwrap_or(max_chars);
        let piece: String = rest.drain(..cut).collect();
        push_trimmed(&mut chunks, &piece);
    }
    let piece: String = rest.into_iter().collect();
    push_trimmed(&mut chunks, &piece);
    chunks
}

fn push_trimmed(chunks: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        chunks.push(piece.to_string());
    }
}
