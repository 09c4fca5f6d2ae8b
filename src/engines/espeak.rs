//! Local synthesis through the `espeak-ng` command-line tool.
//!
//! Lower quality than a neural or cloud voice, but needs no network. The
//! binary must be installed:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: Download installer from <https://espeak-ng.org/download>

use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::{AudioFormat, SynthesisEngine, SynthesisError, SynthesisResult};

/// Parameters for an espeak-ng run.
#[derive(Debug, Clone)]
pub struct EspeakParams {
    /// Words per minute (espeak-ng default 175).
    pub speed_wpm: u32,
    /// Pitch adjustment, 0 to 99 (espeak-ng default 50).
    pub pitch: u32,
}

impl Default for EspeakParams {
    fn default() -> Self {
        Self {
            speed_wpm: 150,
            pitch: 50,
        }
    }
}

/// Optional locations of a bundled espeak-ng install.
#[derive(Debug, Clone, Default)]
pub struct EspeakConfig {
    pub bin_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
}

impl EspeakConfig {
    fn command(&self) -> Command {
        let bin = self
            .bin_path
            .as_deref()
            .unwrap_or_else(|| Path::new("espeak-ng"));
        let mut cmd = Command::new(bin);
        if let Some(data) = &self.data_path {
            cmd.env("ESPEAK_DATA_PATH", data);
        }
        cmd
    }
}

pub struct EspeakEngine {
    espeak: EspeakConfig,
    params: EspeakParams,
}

impl Default for EspeakEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EspeakEngine {
    /// Create an engine that uses `espeak-ng` from PATH.
    pub fn new() -> Self {
        Self {
            espeak: EspeakConfig::default(),
            params: EspeakParams::default(),
        }
    }

    /// Create an engine with explicit espeak-ng binary and data paths.
    ///
    /// Either path can be `None` to fall back to the system default.
    pub fn with_espeak(bin_path: Option<PathBuf>, data_path: Option<PathBuf>) -> Self {
        Self {
            espeak: EspeakConfig {
                bin_path,
                data_path,
            },
            params: EspeakParams::default(),
        }
    }

    pub fn params(mut self, params: EspeakParams) -> Self {
        self.params = params;
        self
    }

    fn run(
        &self,
        text: &str,
        language: &str,
        params: &EspeakParams,
        wav: &Path,
    ) -> Result<(), SynthesisError> {
        let mut child = self
            .espeak
            .command()
            .arg("--stdin")
            .args(["-v", language])
            .arg("-s")
            .arg(params.speed_wpm.to_string())
            .arg("-p")
            .arg(params.pitch.min(99).to_string())
            .arg("-w")
            .arg(wav)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SynthesisError::EspeakNotFound
                } else {
                    SynthesisError::Io(e)
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(newline_terminated(text).as_bytes()) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SynthesisError::EspeakFailed(format!(
                "exited with code {:?}: {stderr}",
                output.status.code()
            )));
        }
        Ok(())
    }
}

impl SynthesisEngine for EspeakEngine {
    type SynthesisParams = EspeakParams;

    fn output_format(&self) -> AudioFormat {
        AudioFormat::Wav
    }

    fn synthesize(
        &mut self,
        text: &str,
        language: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }
        let params = params.unwrap_or_else(|| self.params.clone());

        // espeak-ng only writes a correct WAV header when it can seek, so go
        // through a file instead of stdout.
        let scratch = tempfile::Builder::new().suffix(".wav").tempfile()?;
        self.run(text, language, &params, scratch.path())?;

        let (samples, sample_rate) = read_samples(scratch.path())?;
        if samples.is_empty() {
            return Err(SynthesisError::EmptyResponse);
        }
        Ok(SynthesisResult::Pcm {
            samples,
            sample_rate,
        })
    }
}

/// espeak-ng treats stdin as line-oriented; the last word is dropped without a terminator.
fn newline_terminated(input: &str) -> Cow<'_, str> {
    if input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}

fn read_samples(path: &Path) -> Result<(Vec<f32>, u32), SynthesisError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    // Downmix to mono.
    let samples = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((samples, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn espeak_available() -> bool {
        Command::new("espeak-ng").arg("--version").output().is_ok()
    }

    #[test]
    fn appends_trailing_newline_for_stdin() {
        assert_eq!(newline_terminated("みず"), "みず\n");
        assert_eq!(newline_terminated("みず\n"), "みず\n");
    }

    #[test]
    fn int_wav_is_normalized_and_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [16384i16, 16384, -32768, 0] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let (samples, rate) = read_samples(&path).unwrap();
        assert_eq!(rate, 22050);
        assert_eq!(samples, vec![0.5, -0.5]);
    }

    #[test]
    fn missing_binary_is_reported() {
        let mut engine =
            EspeakEngine::with_espeak(Some(PathBuf::from("/nonexistent/espeak-ng")), None);
        let err = engine.synthesize("水", "ja", None).unwrap_err();
        assert!(matches!(err, SynthesisError::EspeakNotFound));
    }

    /// Stand-in binary: writes `fixture` to the `-w` path unless `-q` is given,
    /// which is how espeak-ng behaves, and logs its arguments.
    #[cfg(unix)]
    fn fake_espeak(dir: &Path, fixture: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("espeak-ng");
        let body = format!(
            "#!/bin/sh\n\
             echo \"$@\" > '{args}'\n\
             out=\"\"\n\
             while [ $# -gt 0 ]; do\n\
             case \"$1\" in\n\
             -q) cat > /dev/null; exit 0 ;;\n\
             -w) out=\"$2\"; shift ;;\n\
             esac\n\
             shift\n\
             done\n\
             cat > /dev/null\n\
             cp '{fixture}' \"$out\"\n",
            args = dir.join("args.txt").display(),
            fixture = fixture.display(),
        );
        std::fs::write(&script, body).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[test]
    fn writes_audio_through_the_wav_flag() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("fixture.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 10,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&fixture, spec).unwrap();
        for _ in 0..4 {
            writer.write_sample(8192i16).unwrap();
        }
        writer.finalize().unwrap();

        let bin = fake_espeak(dir.path(), &fixture);
        let mut engine = EspeakEngine::with_espeak(Some(bin), None);
        let result = engine.synthesize("みず", "ja", None).unwrap();

        assert_eq!(result.duration_secs(), Some(0.4));
        let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert!(args.contains("-v ja"), "{args}");
        assert!(args.contains("-w "), "{args}");
        assert!(!args.split_whitespace().any(|a| a == "-q"), "{args}");
    }

    #[test]
    fn synthesizes_japanese_when_installed() {
        if !espeak_available() {
            return;
        }
        let mut engine = EspeakEngine::new();
        let result = engine.synthesize("みず", "ja", None).unwrap();
        assert_eq!(result.format(), AudioFormat::Wav);
        assert!(result.duration_secs().unwrap() > 0.0);
    }
}
