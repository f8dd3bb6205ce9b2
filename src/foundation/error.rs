pub type NarravidResult<T> = Result<T, NarravidError>;

/// Error kinds produced by the narration pipeline.
///
/// Every variant carries a human-readable message; the orchestrator wraps them in
/// [`PipelineFailure`] so callers always learn which stage failed.
#[derive(thiserror::Error, Debug)]
pub enum NarravidError {
    #[error("audio probe error: {0}")]
    AudioProbe(String),

    /// The rendering surface or a required asset (caption font) could not be loaded.
    /// Fatal for the whole run; there is no per-frame retry.
    #[error("render init error: {0}")]
    RenderInit(String),

    /// A single frame failed to render or persist. The first occurrence aborts the
    /// run; skipping a frame would desynchronize caption timing for every frame after it.
    #[error("frame render error: {0}")]
    FrameRender(String),

    #[error("empty output error: {0}")]
    EmptyOutput(String),

    #[error("compile error: {0}")]
    Compile(String),

    #[error("timeout error: {0}")]
    Timeout(String),

    #[error("unsupported format error: {0}")]
    UnsupportedFormat(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("canceled: {0}")]
    Canceled(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NarravidError {
    pub fn audio_probe(msg: impl Into<String>) -> Self {
        Self::AudioProbe(msg.into())
    }

    pub fn render_init(msg: impl Into<String>) -> Self {
        Self::RenderInit(msg.into())
    }

    pub fn frame_render(msg: impl Into<String>) -> Self {
        Self::FrameRender(msg.into())
    }

    pub fn empty_output(msg: impl Into<String>) -> Self {
        Self::EmptyOutput(msg.into())
    }

    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn canceled(msg: impl Into<String>) -> Self {
        Self::Canceled(msg.into())
    }
}

/// Pipeline stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Probing,
    Segmenting,
    Capturing,
    Compiling,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Probing => "Probing",
            Stage::Segmenting => "Segmenting",
            Stage::Capturing => "Capturing",
            Stage::Compiling => "Compiling",
        };
        f.write_str(name)
    }
}

/// A stage-annotated pipeline failure. No component error crosses the orchestrator
/// boundary without being wrapped in one of these.
#[derive(thiserror::Error, Debug)]
#[error("pipeline failed during {stage}: {error}")]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: NarravidError,
}

impl PipelineFailure {
    pub fn new(stage: Stage, error: NarravidError) -> Self {
        Self { stage, error }
    }
}
