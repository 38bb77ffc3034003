use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use sha2::Digest as _;

use wordreel::{
    AnimationTiming, CaptionPipeline, FixedAdvanceShaper, FontShaper, FrameRGBA, OverlayRenderer,
    PipelineOpts, SessionOpts, StyleConfig, WordTimeline, plan_captions, resolve,
};

#[derive(Parser, Debug)]
#[command(name = "wordreel", version, about = "Burn word-synced captions into vertical video")]
struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Caption one video, or every video in a directory (requires `ffmpeg` and `ffprobe`).
    Run(RunArgs),
    /// Render the caption overlay at one instant as a PNG.
    Frame(FrameArgs),
    /// Print the computed caption layout as JSON.
    Layout(LayoutArgs),
    /// Print the default style configuration as JSON.
    PrintDefaultConfig,
}

#[derive(Args, Debug)]
struct StyleArgs {
    /// Style configuration JSON. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the font family and SHA-256 of the font bytes.
    #[arg(long)]
    dump_font: bool,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input video file or directory.
    #[arg(long)]
    input: PathBuf,

    /// Output file (single video) or directory (batch).
    #[arg(long)]
    output: PathBuf,

    /// Word timeline JSON for a single video. Defaults to `<stem>.words.json` beside it.
    #[arg(long)]
    words: Option<PathBuf>,

    #[command(flatten)]
    style: StyleArgs,

    /// Worker threads for overlay rendering.
    #[arg(long)]
    threads: Option<usize>,

    /// Render overlays on the calling thread only.
    #[arg(long)]
    sequential: bool,

    /// Frames per render chunk.
    #[arg(long, default_value_t = 64)]
    chunk_size: usize,

    /// Render every frame even when its caption state repeats.
    #[arg(long)]
    no_elision: bool,

    /// Replace existing output files.
    #[arg(long)]
    overwrite: bool,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Word timeline JSON.
    #[arg(long)]
    words: PathBuf,

    /// Source video width in pixels.
    #[arg(long, default_value_t = 1080)]
    width: i64,

    /// Source video height in pixels.
    #[arg(long, default_value_t = 1920)]
    height: i64,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    style: StyleArgs,

    /// Time in seconds.
    #[arg(long)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct LayoutArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    style: StyleArgs,

    /// Measure text with a fixed 0.6em advance instead of the font.
    #[arg(long)]
    fixed_advance: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Layout(args) => cmd_layout(args),
        Command::PrintDefaultConfig => {
            println!("{}", StyleConfig::default().to_json_pretty()?);
            Ok(())
        }
    }
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_style(args: &StyleArgs) -> anyhow::Result<StyleConfig> {
    let style = match &args.config {
        Some(path) => StyleConfig::load(path)?,
        None => StyleConfig::default(),
    };
    Ok(style)
}

fn load_pipeline(args: &StyleArgs, opts: PipelineOpts) -> anyhow::Result<CaptionPipeline> {
    let style = load_style(args)?;
    let pipeline = CaptionPipeline::from_style(style, opts)?;
    if args.dump_font {
        dump_font(&pipeline)?;
    }
    Ok(pipeline)
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let opts = PipelineOpts {
        session: SessionOpts {
            parallel: !args.sequential,
            chunk_size: args.chunk_size,
            threads: args.threads,
            static_frame_elision: !args.no_elision,
            ..SessionOpts::default()
        },
        overwrite: args.overwrite,
    };
    let pipeline = load_pipeline(&args.style, opts)?;

    if args.input.is_dir() {
        let report = pipeline.process_dir(&args.input, &args.output)?;
        for (video, err) in &report.failed {
            eprintln!("failed {}: {err}", video.display());
        }
        eprintln!(
            "captioned {}/{} videos into {}",
            report.succeeded.len(),
            report.total(),
            args.output.display()
        );
        if !report.all_succeeded() {
            anyhow::bail!("{} of {} videos failed", report.failed.len(), report.total());
        }
        return Ok(());
    }

    let words_path = args
        .words
        .clone()
        .unwrap_or_else(|| wordreel::words_path_for(&args.input));
    let words = WordTimeline::load(&words_path)?;
    let report = pipeline
        .process_video(&args.input, &words, &args.output)
        .with_context(|| format!("caption '{}'", args.input.display()))?;
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    eprintln!("wrote {}", report.output.display());
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let pipeline = load_pipeline(&args.style, PipelineOpts::default())?;
    let words = WordTimeline::load(&args.source.words)?;
    let plan = pipeline.plan(args.source.width, args.source.height, &words)?;
    let canvas = plan.geometry.pad.canvas();

    let renderer = OverlayRenderer::new(pipeline.font(), &plan.style, canvas)?;
    let timing = AnimationTiming::from_style(&plan.style);
    let frame = match resolve(&plan.layout, args.time, &timing) {
        Some(state) => renderer.render(&plan.layout, &state)?,
        None => FrameRGBA::transparent(canvas),
    };

    write_png(&args.out, &frame)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_layout(args: LayoutArgs) -> anyhow::Result<()> {
    let style = load_style(&args.style)?;
    let words = WordTimeline::load(&args.source.words)?;
    let (w, h) = (args.source.width, args.source.height);

    let plan = if args.fixed_advance {
        plan_captions(w, h, &words, &style, &mut FixedAdvanceShaper::default())?
    } else {
        let pipeline = CaptionPipeline::new(
            style.clone(),
            wordreel::LoadedFont::load(&style.font)?,
            PipelineOpts::default(),
        )?;
        if args.style.dump_font {
            dump_font(&pipeline)?;
        }
        pipeline.plan(w, h, &words)?
    };

    let out = serde_json::json!({
        "geometry": plan.geometry,
        "layout": plan.layout,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&out).context("serialize layout")?
    );
    Ok(())
}

fn write_png(path: &Path, frame: &FrameRGBA) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        path,
        &frame.to_straight_rgba8(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

fn dump_font(pipeline: &CaptionPipeline) -> anyhow::Result<()> {
    let font = pipeline.font();
    let shaper = FontShaper::new(font)?;
    eprintln!("font diagnostics:");
    eprintln!("  path:    {}", font.path().display());
    eprintln!("  family:  {}", shaper.family_name());
    eprintln!("  sha256:  {}", sha256_hex(font.bytes()));
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
