use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::capture::{FRAME_PATTERN, frame_file_name};
use crate::foundation::{
    core::Fps,
    error::{NarravidError, NarravidResult},
};

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> NarravidResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Mux the staged frame sequence with the narration audio into one H.264 MP4.
///
/// `-shortest` implements the trimming policy: when rounding leaves the frame
/// sequence a hair longer or shorter than the audio, the output is cut to the
/// shorter track, so there is never trailing silence or a frozen last frame.
///
/// The encode goes to a temporary sibling path and is renamed over `out_path` only
/// on success; a failed encode never replaces a previously good output.
pub fn compile_video(
    frames_dir: &Path,
    fps: Fps,
    audio_path: &Path,
    out_path: &Path,
) -> NarravidResult<PathBuf> {
    fps.validate()?;

    let first_frame = frames_dir.join(frame_file_name(0));
    if !first_frame.is_file() {
        return Err(NarravidError::compile(format!(
            "frame sequence is missing its first frame '{}'",
            first_frame.display()
        )));
    }
    if !audio_path.is_file() {
        return Err(NarravidError::compile(format!(
            "audio file '{}' does not exist",
            audio_path.display()
        )));
    }

    // We use the system `ffmpeg` binary rather than native FFmpeg bindings to avoid
    // dev header/lib requirements.
    if !is_ffmpeg_on_path() {
        return Err(NarravidError::compile(
            "ffmpeg is required for video compilation, but was not found on PATH",
        ));
    }

    ensure_parent_dir(out_path)?;
    let tmp_path = temp_output_path(out_path);

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .args(["-loglevel", "error"])
        .args(["-framerate", &fps.0.to_string()])
        .arg("-i")
        .arg(frames_dir.join(FRAME_PATTERN))
        .arg("-i")
        .arg(audio_path)
        .args([
            "-c:v",
            "libx264",
            "-preset",
            "fast",
            "-crf",
            "18",
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            "aac",
            "-shortest",
            "-movflags",
            "+faststart",
        ])
        .arg(&tmp_path);

    debug!(
        frames = %frames_dir.display(),
        audio = %audio_path.display(),
        out = %out_path.display(),
        "starting ffmpeg encode"
    );

    let out = cmd
        .output()
        .map_err(|e| NarravidError::compile(format!("failed to spawn ffmpeg: {e}")))?;
    if !out.status.success() {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(NarravidError::compile(format!(
            "ffmpeg exited with status {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    std::fs::rename(&tmp_path, out_path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        NarravidError::compile(format!(
            "failed to move encoded video into place at '{}': {e}",
            out_path.display()
        ))
    })?;

    info!(out = %out_path.display(), "video compile complete");
    Ok(out_path.to_path_buf())
}

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Temporary encode target next to the final output. Same directory so the final
/// rename stays on one filesystem; `.mp4` suffix so ffmpeg picks the mp4 muxer.
/// Unique per call, so concurrent encodes targeting the same output path never
/// clobber each other's in-flight file.
fn temp_output_path(out_path: &Path) -> PathBuf {
    let stem = out_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    out_path.with_file_name(format!("{stem}.part-{}-{seq}.mp4", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_first_frame_is_compile_error() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("a.wav");
        std::fs::write(&audio, b"").unwrap();
        let err = compile_video(dir.path(), Fps(30), &audio, &dir.path().join("out.mp4"))
            .unwrap_err();
        assert!(matches!(err, NarravidError::Compile(_)));
        assert!(err.to_string().contains("first frame"));
    }

    #[test]
    fn missing_audio_is_compile_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(frame_file_name(0)), b"png").unwrap();
        let err = compile_video(
            dir.path(),
            Fps(30),
            Path::new("/no/such/audio.wav"),
            &dir.path().join("out.mp4"),
        )
        .unwrap_err();
        assert!(matches!(err, NarravidError::Compile(_)));
    }

    #[test]
    fn temp_path_is_a_sibling_mp4() {
        let tmp = temp_output_path(Path::new("/tmp/videos/final.mp4"));
        assert_eq!(tmp.parent(), Some(Path::new("/tmp/videos")));
        assert_eq!(tmp.extension().and_then(|e| e.to_str()), Some("mp4"));
        assert_ne!(tmp, Path::new("/tmp/videos/final.mp4"));
    }

    #[test]
    fn temp_paths_are_unique_for_the_same_output() {
        let out = Path::new("/tmp/videos/final.mp4");
        assert_ne!(temp_output_path(out), temp_output_path(out));
    }

    #[test]
    fn failed_compile_preserves_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        std::fs::write(&out, b"previous good encode").unwrap();
        std::fs::write(dir.path().join(frame_file_name(0)), b"png").unwrap();

        let err = compile_video(dir.path(), Fps(30), Path::new("/no/such/audio.wav"), &out)
            .unwrap_err();
        assert!(matches!(err, NarravidError::Compile(_)));

        assert_eq!(std::fs::read(&out).unwrap(), b"previous good encode");
        let partials: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|name| name.contains(".part-"))
            .collect();
        assert!(partials.is_empty(), "leftover temp files: {partials:?}");
    }
}
