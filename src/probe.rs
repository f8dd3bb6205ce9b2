use std::path::Path;

use tracing::debug;

use crate::foundation::error::{NarravidError, NarravidResult};

/// Extract the authoritative duration (seconds) from a narration audio file via the
/// system `ffprobe` binary.
///
/// Every downstream timing decision (caption allocation, frame count) derives from
/// this value; nothing else in the pipeline estimates duration independently.
pub fn probe_audio_duration(audio_path: &Path) -> NarravidResult<f64> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    if !audio_path.is_file() {
        return Err(NarravidError::audio_probe(format!(
            "audio file '{}' does not exist",
            audio_path.display()
        )));
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(audio_path)
        .output()
        .map_err(|e| NarravidError::audio_probe(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(NarravidError::audio_probe(format!(
            "ffprobe failed for '{}': {}",
            audio_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| NarravidError::audio_probe(format!("ffprobe json parse failed: {e}")))?;

    if !parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"))
    {
        return Err(NarravidError::audio_probe(format!(
            "'{}' contains no audio stream",
            audio_path.display()
        )));
    }

    let duration = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| {
            NarravidError::audio_probe(format!(
                "'{}' reports no parseable duration",
                audio_path.display()
            ))
        })?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(NarravidError::audio_probe(format!(
            "'{}' reports a non-positive duration ({duration})",
            audio_path.display()
        )));
    }

    debug!(duration, path = %audio_path.display(), "probed narration audio");
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_audio_probe_error() {
        let err = probe_audio_duration(Path::new("/no/such/narration.wav")).unwrap_err();
        assert!(matches!(err, NarravidError::AudioProbe(_)));
        assert!(err.to_string().contains("does not exist"));
    }
}
