use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::capture::capture_frames;
use crate::foundation::{
    core::Fps,
    error::{NarravidError, NarravidResult, PipelineFailure, Stage},
};
use crate::scene::{AvatarSceneFactory, RendererFactory, SceneConfig};
use crate::script::{CaptionSegment, segment};

/// External media tooling consumed by the orchestrator. The default implementation
/// shells out to ffprobe/ffmpeg; tests substitute their own.
pub trait MediaBackend: Send + Sync {
    fn probe_duration(&self, audio_path: &Path) -> NarravidResult<f64>;

    fn compile(
        &self,
        frames_dir: &Path,
        fps: Fps,
        audio_path: &Path,
        out_path: &Path,
    ) -> NarravidResult<PathBuf>;
}

/// System ffprobe/ffmpeg backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegBackend;

impl MediaBackend for FfmpegBackend {
    fn probe_duration(&self, audio_path: &Path) -> NarravidResult<f64> {
        crate::probe::probe_audio_duration(audio_path)
    }

    fn compile(
        &self,
        frames_dir: &Path,
        fps: Fps,
        audio_path: &Path,
        out_path: &Path,
    ) -> NarravidResult<PathBuf> {
        crate::encode::compile_video(frames_dir, fps, audio_path, out_path)
    }
}

/// How often the orchestrator re-checks cancellation and the stage deadline while a
/// stage worker is busy. Bounds how long a cancel can go unnoticed.
const STAGE_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Cooperative cancellation handle for an in-flight run. Clonable; cancel from any
/// thread. The capture loop observes it between frames, and the orchestrator polls
/// it while any stage is in flight, so even a stage blocked in an external call
/// fails promptly; cleanup still runs unconditionally.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub fps: Fps,
    pub scene: SceneConfig,
    /// Upper bound for any single stage. A stalled render surface or a hung encoder
    /// fails the run with `Timeout` attributed to that stage; no partial salvage.
    pub stage_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            scene: SceneConfig::default(),
            stage_timeout: Duration::from_secs(600),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> NarravidResult<()> {
        self.fps.validate()?;
        self.scene.validate()?;
        if self.stage_timeout.is_zero() {
            return Err(NarravidError::validation("stage_timeout must be > 0"));
        }
        Ok(())
    }
}

/// One pipeline invocation: narration text, an already-synthesized audio file, and
/// the output video path.
#[derive(Clone, Debug)]
pub struct RunRequest {
    pub text: String,
    pub audio_path: PathBuf,
    pub out_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub out_path: PathBuf,
    pub audio_duration: f64,
    pub frames_written: u64,
    pub segment_count: usize,
}

/// Batch orchestrator for `(text, audio) -> video`.
///
/// Stage sequence: `Probing -> Segmenting -> Capturing -> Compiling`. Each stage body
/// runs on its own worker thread and is awaited with a timeout, so a hung external
/// call cannot wedge the caller. The per-run staging directory is removed on every
/// exit path: success, stage failure, timeout, cancellation, and unwind.
///
/// One `Pipeline` may serve any number of concurrent runs; every run gets a fresh
/// renderer and a fresh staging directory, and no mutable state is shared.
pub struct Pipeline {
    config: PipelineConfig,
    backend: Arc<dyn MediaBackend>,
    renderer_factory: Arc<dyn RendererFactory>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let factory = AvatarSceneFactory::new(config.scene.clone());
        Self {
            config,
            backend: Arc::new(FfmpegBackend),
            renderer_factory: Arc::new(factory),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn MediaBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_renderer_factory(mut self, factory: Arc<dyn RendererFactory>) -> Self {
        self.renderer_factory = factory;
        self
    }

    pub fn run(&self, request: RunRequest) -> Result<RunReport, PipelineFailure> {
        self.run_with_cancel(request, CancelToken::new())
    }

    pub fn run_with_cancel(
        &self,
        request: RunRequest,
        cancel: CancelToken,
    ) -> Result<RunReport, PipelineFailure> {
        let fail = |error| PipelineFailure::new(Stage::Probing, error);
        self.config.validate().map_err(fail)?;
        crate::encode::ensure_parent_dir(&request.out_path).map_err(fail)?;

        // Acquired before the first stage, released by Drop on every exit path.
        let staging = StagingDir::create(&request.out_path).map_err(fail)?;
        info!(
            audio = %request.audio_path.display(),
            out = %request.out_path.display(),
            staging = %staging.path().display(),
            "pipeline run started"
        );

        let audio_duration = {
            let backend = Arc::clone(&self.backend);
            let audio_path = request.audio_path.clone();
            self.run_stage(Stage::Probing, &cancel, move || {
                backend.probe_duration(&audio_path)
            })?
        };
        if !audio_duration.is_finite() || audio_duration <= 0.0 {
            return Err(PipelineFailure::new(
                Stage::Probing,
                NarravidError::audio_probe(format!(
                    "probed duration must be positive, got {audio_duration}"
                )),
            ));
        }

        // Segmentation degrades gracefully for any input, so this stage cannot fail
        // on its own; it still participates in timeout/cancel accounting.
        let segments: Vec<CaptionSegment> = {
            let text = request.text.clone();
            self.run_stage(Stage::Segmenting, &cancel, move || {
                Ok(segment(&text, audio_duration))
            })?
        };

        let frames_written = {
            let factory = Arc::clone(&self.renderer_factory);
            let segments = segments.clone();
            let fps = self.config.fps;
            let frames_dir = staging.path().to_path_buf();
            let capture_cancel = cancel.clone();
            self.run_stage(Stage::Capturing, &cancel, move || {
                let mut renderer = factory.create(&segments)?;
                capture_frames(
                    renderer.as_mut(),
                    audio_duration,
                    fps,
                    &frames_dir,
                    &capture_cancel,
                )
            })?
        };

        let out_path = {
            let backend = Arc::clone(&self.backend);
            let fps = self.config.fps;
            let frames_dir = staging.path().to_path_buf();
            let audio_path = request.audio_path.clone();
            let out_path = request.out_path.clone();
            self.run_stage(Stage::Compiling, &cancel, move || {
                backend.compile(&frames_dir, fps, &audio_path, &out_path)
            })?
        };

        info!(
            out = %out_path.display(),
            frames = frames_written,
            duration = audio_duration,
            "pipeline run complete"
        );
        Ok(RunReport {
            out_path,
            audio_duration,
            frames_written,
            segment_count: segments.len(),
        })
    }

    /// Run one stage body on a worker thread and await it with the configured
    /// timeout. The result channel is polled in short increments so cancellation
    /// interrupts even a stage that is blocked in an external call: the worker is
    /// abandoned, the run fails with `Canceled`, and staging cleanup proceeds
    /// immediately. On timeout the cancel token is tripped so a cooperative stage
    /// (capture) stops promptly; the run fails either way.
    fn run_stage<T: Send + 'static>(
        &self,
        stage: Stage,
        cancel: &CancelToken,
        body: impl FnOnce() -> NarravidResult<T> + Send + 'static,
    ) -> Result<T, PipelineFailure> {
        if cancel.is_canceled() {
            return Err(PipelineFailure::new(
                stage,
                NarravidError::canceled("run canceled before stage started"),
            ));
        }

        let span = tracing::info_span!("stage", name = %stage);
        let worker_span = span.clone();
        let (tx, rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name(format!("narravid-{stage}"))
            .spawn(move || {
                let _guard = worker_span.enter();
                let _ = tx.send(body());
            });
        if let Err(e) = spawned {
            return Err(PipelineFailure::new(
                stage,
                NarravidError::Other(anyhow::anyhow!("failed to spawn stage worker: {e}")),
            ));
        }

        let deadline = Instant::now() + self.config.stage_timeout;
        loop {
            match rx.recv_timeout(STAGE_POLL_INTERVAL) {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(error)) => return Err(PipelineFailure::new(stage, error)),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if cancel.is_canceled() {
                        // Abandon the worker; its late result goes to a dropped
                        // receiver.
                        warn!(stage = %stage, "stage abandoned after cancellation");
                        return Err(PipelineFailure::new(
                            stage,
                            NarravidError::canceled("run canceled while stage was in flight"),
                        ));
                    }
                    if Instant::now() >= deadline {
                        // Let a cooperative worker wind down; the run is over
                        // regardless.
                        cancel.cancel();
                        warn!(stage = %stage, "stage timed out");
                        return Err(PipelineFailure::new(
                            stage,
                            NarravidError::timeout(format!(
                                "stage did not complete within {:?}",
                                self.config.stage_timeout
                            )),
                        ));
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(PipelineFailure::new(
                        stage,
                        NarravidError::Other(anyhow::anyhow!(
                            "stage worker terminated without producing a result"
                        )),
                    ));
                }
            }
        }
    }
}

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Per-run frame staging directory, unique across concurrent runs in one process.
/// Removal is in `Drop` so it happens on success, failure, and unwind alike.
struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    fn create(out_path: &Path) -> NarravidResult<Self> {
        let parent = match out_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = parent.join(format!("frames-{}-{seq}", std::process::id()));
        std::fs::create_dir_all(&path).map_err(|e| {
            NarravidError::validation(format!(
                "failed to create staging directory '{}': {e}",
                path.display()
            ))
        })?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if std::fs::remove_dir_all(&self.path).is_ok() {
            return;
        }
        // An abandoned capture worker may finish one last frame write while the
        // first removal is enumerating; give it a beat and try again.
        std::thread::sleep(Duration::from_millis(50));
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!(
                staging = %self.path.display(),
                "failed to remove staging directory: {e}"
            );
        }
    }
}
