use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SynthesisError;
use crate::{AudioFormat, SynthesisEngine};

/// Where a clip came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipSource {
    /// Already on disk from an earlier run; the engine was not called.
    Cached,
    Synthesized,
}

/// A clip on disk, ready to be bundled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedClip {
    pub index: usize,
    pub path: PathBuf,
    pub file_name: String,
    pub source: ClipSource,
}

impl CachedClip {
    /// Field value that makes Anki play this clip.
    pub fn sound_tag(&self) -> String {
        format!("[sound:{}]", self.file_name)
    }
}

/// Directory of per-record clips keyed by record position.
///
/// Re-running over a populated directory only synthesizes what is missing,
/// which is how an interrupted batch is resumed.
#[derive(Debug, Clone)]
pub struct AudioCache {
    dir: PathBuf,
    format: AudioFormat,
}

impl AudioCache {
    /// Open the cache, creating `dir` if needed.
    pub fn create(dir: &Path, format: AudioFormat) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            format,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(&self, index: usize) -> String {
        format!("word_{index}.{}", self.format.extension())
    }

    pub fn path(&self, index: usize) -> PathBuf {
        self.dir.join(self.file_name(index))
    }

    /// Return the clip for record `index`, synthesizing `text` only when the
    /// file does not exist yet.
    pub fn fetch<E: SynthesisEngine>(
        &self,
        index: usize,
        text: &str,
        language: &str,
        engine: &mut E,
    ) -> Result<CachedClip, SynthesisError> {
        let path = self.path(index);
        let file_name = self.file_name(index);

        if path.is_file() {
            return Ok(CachedClip {
                index,
                path,
                file_name,
                source: ClipSource::Cached,
            });
        }

        let written = engine
            .synthesize(text, language, None)
            .and_then(|result| result.write(&path));
        if let Err(e) = written {
            // Leave no truncated clip behind, or the next run would treat it as cached.
            if path.exists() {
                let _ = fs::remove_file(&path);
            }
            return Err(e);
        }

        Ok(CachedClip {
            index,
            path,
            file_name,
            source: ClipSource::Synthesized,
        })
    }
}
