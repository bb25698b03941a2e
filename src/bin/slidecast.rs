use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "slidecast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the slideshow to MP4 (requires `ffmpeg` on PATH).
    Export(ExportArgs),
    /// Play the slideshow clock in real time and print slide and subtitle changes.
    Preview(PreviewArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Parse an SRT file and print its cues as JSON.
    Cues(CuesArgs),
}

/// Media and settings shared by every rendering command. Flags override the project file.
#[derive(Args, Debug)]
struct InputArgs {
    /// Project JSON; relative paths inside it are resolved against its directory.
    #[arg(long)]
    project: Option<PathBuf>,

    /// Slide image (repeat for more slides, in display order).
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// Narration audio file.
    #[arg(long)]
    narration: Option<PathBuf>,

    /// Background music file, looped under the narration.
    #[arg(long)]
    music: Option<PathBuf>,

    /// SRT subtitle file.
    #[arg(long)]
    subtitles: Option<PathBuf>,

    /// Seconds per slide (1-30).
    #[arg(long)]
    duration: Option<u32>,

    /// Pan/zoom effect.
    #[arg(long, value_enum)]
    effect: Option<EffectChoice>,

    /// Music volume (0-1).
    #[arg(long)]
    music_volume: Option<f32>,

    /// Subtitle font file (defaults to $SLIDECAST_FONT, then a bold system sans-serif).
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Pace the render loop at the frame rate instead of as fast as possible.
    #[arg(long)]
    realtime: bool,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    input: InputArgs,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Timestamp in seconds.
    #[arg(long, default_value_t = 0.0)]
    at: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct CuesArgs {
    /// SRT file.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EffectChoice {
    ZoomIn,
    ZoomOut,
    Pan,
    None,
}

impl From<EffectChoice> for slidecast::Effect {
    fn from(choice: EffectChoice) -> Self {
        match choice {
            EffectChoice::ZoomIn => slidecast::Effect::ZoomIn,
            EffectChoice::ZoomOut => slidecast::Effect::ZoomOut,
            EffectChoice::Pan => slidecast::Effect::Pan,
            EffectChoice::None => slidecast::Effect::None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Cues(args) => cmd_cues(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("slidecast=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_project(input: &InputArgs) -> anyhow::Result<slidecast::ProjectFile> {
    let mut project = match &input.project {
        Some(path) => slidecast::ProjectFile::load(path)
            .with_context(|| format!("load project '{}'", path.display()))?,
        None => slidecast::ProjectFile::default(),
    };

    if !input.images.is_empty() {
        project.images = input.images.clone();
    }
    if input.narration.is_some() {
        project.narration = input.narration.clone();
    }
    if input.music.is_some() {
        project.music = input.music.clone();
    }
    if input.subtitles.is_some() {
        project.subtitles = input.subtitles.clone();
    }
    if input.font.is_some() {
        project.font = input.font.clone();
    }
    if let Some(secs) = input.duration {
        project.settings.per_slide_duration_secs = secs;
    }
    if let Some(effect) = input.effect {
        project.settings.effect = effect.into();
    }
    if let Some(volume) = input.music_volume {
        project.settings.music_volume = volume;
    }
    Ok(project)
}

fn build_studio(
    project: &slidecast::ProjectFile,
    pacing: slidecast::Pacing,
) -> anyhow::Result<slidecast::Studio> {
    let settings = slidecast::CaptureSettings {
        pacing,
        font_path: project.font.clone(),
        ..slidecast::CaptureSettings::default()
    };
    let mut studio = slidecast::Studio::new(settings);
    project.apply(&mut studio)?;
    Ok(studio)
}

/// Prints export progress on one stderr line.
struct ProgressLine;

impl slidecast::PipelineObserver for ProgressLine {
    fn on_state_change(&mut self, from: slidecast::CaptureState, to: slidecast::CaptureState) {
        if from == slidecast::CaptureState::Finalizing && to == slidecast::CaptureState::Idle {
            eprintln!();
        }
    }

    fn on_progress(&mut self, percent: u8) {
        eprint!("\rexporting {percent:>3}%");
    }
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    if !slidecast::is_ffmpeg_on_path() {
        anyhow::bail!("ffmpeg was not found on PATH");
    }
    let project = load_project(&args.input)?;
    let pacing = if args.realtime {
        slidecast::Pacing::Realtime
    } else {
        slidecast::Pacing::Offline
    };

    let out = args
        .out
        .or_else(|| project.output.clone())
        .unwrap_or_else(|| PathBuf::from(slidecast::DEFAULT_OUTPUT_NAME));

    let mut studio = build_studio(&project, pacing)?.with_export_observer(Box::new(ProgressLine));
    let sink = slidecast::FfmpegSink::new(slidecast::FfmpegSinkOpts {
        out_path: out.clone(),
        bg_rgba: studio.settings().background,
    });

    let report = studio
        .export(Box::new(sink), Some(out.clone()))
        .with_context(|| format!("export '{}'", out.display()))?;

    if report.encoder_failed {
        eprintln!(
            "warning: encoder stopped early after {} frames",
            report.frames
        );
    }
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let project = load_project(&args.input)?;
    let mut studio = build_studio(&project, slidecast::Pacing::Offline)?
        .with_preview_pacing(slidecast::Pacing::Realtime);
    studio.start_preview()?;

    let mut last: Option<(usize, String)> = None;
    while let Some(update) = studio.poll_preview() {
        if !update.playing {
            break;
        }
        let current = (update.slide_index, update.subtitle);
        if last.as_ref() != Some(&current) {
            println!(
                "{:>8.3}s  slide {:>3}  {}",
                update.time, current.0, current.1
            );
            last = Some(current);
        }
        studio.advance_preview();
    }
    eprintln!("preview finished");
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let project = load_project(&args.input)?;
    let studio = build_studio(&project, slidecast::Pacing::Offline)?;
    let frame = studio.render_frame_at(args.at)?.to_straight();
    write_png(&args.out, &frame)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn write_png(out: &Path, frame: &slidecast::FrameRGBA) -> anyhow::Result<()> {
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))
}

fn cmd_cues(args: CuesArgs) -> anyhow::Result<()> {
    let cues = slidecast::load_srt_file(&args.in_path)?;
    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), &cues).context("write cues JSON")?;
    println!();
    Ok(())
}
