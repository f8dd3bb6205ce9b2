use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "narravid", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline: narration text + audio -> captioned avatar MP4
    /// (requires `ffmpeg`/`ffprobe` on PATH).
    Render(RenderArgs),
    /// Render the scene at a single timestamp as a PNG, for debugging.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Narration text document (txt/md). Mutually exclusive with --text.
    #[arg(long, conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Narration text given inline.
    #[arg(long)]
    text: Option<String>,

    /// Synthesized narration audio file.
    #[arg(long)]
    audio: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    scene: SceneArgs,

    /// Frames per second of the output video.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Per-stage timeout in seconds.
    #[arg(long, default_value_t = 600)]
    stage_timeout_secs: u64,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Narration text given inline.
    #[arg(long)]
    text: String,

    /// Timestamp to render, in seconds.
    #[arg(long)]
    time: f64,

    /// Total narration duration used for caption timing, in seconds.
    #[arg(long)]
    duration: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    scene: SceneArgs,
}

#[derive(Parser, Debug)]
struct SceneArgs {
    /// Canvas width (must be even).
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Canvas height (must be even).
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Caption font file; defaults to scanning common system font locations.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Seed for the blink RNG.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl SceneArgs {
    fn to_config(&self) -> narravid::SceneConfig {
        narravid::SceneConfig {
            canvas: narravid::Canvas {
                width: self.width,
                height: self.height,
            },
            caption_font: self.font.clone(),
            seed: self.seed,
            ..narravid::SceneConfig::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let text = match (&args.input, args.text) {
        (Some(path), None) => narravid::extract_text(path)?,
        (None, Some(text)) => text,
        (None, None) => anyhow::bail!("either --input or --text is required"),
        (Some(_), Some(_)) => unreachable!("clap enforces the conflict"),
    };

    let config = narravid::PipelineConfig {
        fps: narravid::Fps::new(args.fps)?,
        scene: args.scene.to_config(),
        stage_timeout: Duration::from_secs(args.stage_timeout_secs),
    };

    let pipeline = narravid::Pipeline::new(config);
    let report = pipeline.run(narravid::RunRequest {
        text,
        audio_path: args.audio,
        out_path: args.out,
    })?;

    eprintln!(
        "wrote {} ({} frames, {:.2}s narration, {} captions)",
        report.out_path.display(),
        report.frames_written,
        report.audio_duration,
        report.segment_count
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    use narravid::SceneRenderer as _;

    let script = narravid::NarrationScript::new(args.text, args.duration)?;
    let segments = script.segments();
    let mut scene = narravid::AvatarScene::new(args.scene.to_config(), segments)?;
    let frame = scene.render_at(args.time)?;

    narravid::ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
