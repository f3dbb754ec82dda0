//! Voice message conversion.
//!
//! Telegram delivers voice notes as OGG/Opus (`.oga`); the transcription
//! endpoint gets 16-bit mono PCM WAV produced by an external `ffmpeg`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

/// Errors produced while converting audio
#[derive(Debug, Error)]
pub enum AudioError {
    /// Temporary file could not be written or read
    #[error("Temporary file error: {0}")]
    Io(#[from] std::io::Error),
    /// The ffmpeg process could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        /// Program that was executed
        program: String,
        /// Underlying OS error
        source: std::io::Error,
    },
    /// ffmpeg ran but reported a failure
    #[error("Failed to convert oga to wav (status {status}): {stderr}")]
    Ffmpeg {
        /// Exit status as reported by the OS
        status: String,
        /// Tail of ffmpeg's stderr
        stderr: String,
    },
}

/// Temp file removed when dropped, whatever happened in between
struct TempAudioFile {
    path: PathBuf,
}

impl TempAudioFile {
    fn new(suffix: &str) -> Self {
        let name = format!("voice-{}.{suffix}", Uuid::new_v4().as_simple());
        Self {
            path: std::env::temp_dir().join(name),
        }
    }
}

impl Drop for TempAudioFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {e}", self.path.display());
            }
        }
    }
}

/// Arguments for an ffmpeg run converting `input` to 44.1kHz mono WAV at `output`
#[must_use]
pub fn ffmpeg_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-acodec".to_string(),
        "pcm_s16le".to_string(),
        "-ac".to_string(),
        "1".to_string(),
        "-ar".to_string(),
        "44100".to_string(),
        "-f".to_string(),
        "wav".to_string(),
        output.display().to_string(),
    ]
}

/// Converts an OGG/Opus recording to WAV using the `ffmpeg` binary at `ffmpeg`.
///
/// # Errors
///
/// Returns `AudioError::Spawn` when ffmpeg is missing, `AudioError::Ffmpeg`
/// when it exits unsuccessfully and `AudioError::Io` on temp file failures.
pub async fn convert_oga_to_wav(ffmpeg: &str, oga_audio: &[u8]) -> Result<Vec<u8>, AudioError> {
    let input = TempAudioFile::new("oga");
    let output = TempAudioFile::new("wav");

    tokio::fs::write(&input.path, oga_audio).await?;

    let result = Command::new(ffmpeg)
        .args(ffmpeg_args(&input.path, &output.path))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| AudioError::Spawn {
            program: ffmpeg.to_string(),
            source,
        })?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        return Err(AudioError::Ffmpeg {
            status: result.status.to_string(),
            stderr: tail.into_iter().rev().collect::<Vec<_>>().join("\n"),
        });
    }

    let wav = tokio::fs::read(&output.path).await?;
    debug!(
        "Converted {} bytes of oga into {} bytes of wav",
        oga_audio.len(),
        wav.len()
    );
    Ok(wav)
}
