use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flatview", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a JSON report about a source video (requires `ffprobe` on PATH).
    Inspect(InspectArgs),
    /// Convert a spatial video to side-by-side (requires `ffmpeg` 7.1+ on PATH).
    Convert(ConvertArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Metadata identifier that marks spatial video.
    #[arg(long)]
    spatial_identifier: Option<String>,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input spatial video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output video path.
    #[arg(long)]
    out: PathBuf,

    /// JSON file with conversion options; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output codec.
    #[arg(long, value_enum)]
    codec: Option<CodecChoice>,

    /// Backing scale factor applied to each eye view.
    #[arg(long)]
    scale: Option<f64>,

    /// What to do with frames the writer refuses.
    #[arg(long, value_enum)]
    append_policy: Option<PolicyChoice>,

    /// Overwrite output if it already exists.
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Do not print progress.
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CodecChoice {
    H264,
    Hevc,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyChoice {
    Drop,
    Retry,
    Abort,
}

#[derive(serde::Serialize)]
struct InspectReport<'a> {
    source: &'a flatview::SpatialVideoAsset,
    is_spatial: bool,
    geometry: flatview::TrackGeometry,
    applied_size: flatview::PixelSize,
    output_size: flatview::PixelSize,
    rotation_degrees: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(args).await,
        Command::Convert(args) => cmd_convert(args).await,
    }
}

async fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let path = args.in_path.clone();
    let asset = tokio::task::spawn_blocking(move || flatview::SpatialVideoAsset::probe(&path))
        .await
        .context("probe task")?
        .with_context(|| format!("probe '{}'", args.in_path.display()))?;

    let mut opts = flatview::InspectOpts::default();
    if let Some(id) = args.spatial_identifier {
        opts.spatial_identifier = id;
    }
    let inspection = flatview::inspect(&asset, &opts)?;
    let report = InspectReport {
        source: &asset,
        is_spatial: inspection.is_spatial,
        geometry: inspection.geometry,
        applied_size: inspection.geometry.applied_size(),
        output_size: inspection.geometry.output_size(),
        rotation_degrees: inspection.geometry.orientation.rotation_degrees(),
    };
    let json = serde_json::to_string_pretty(&report).context("serialize report")?;
    println!("{json}");
    Ok(())
}

async fn cmd_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let mut opts = match &args.config {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("read config '{}'", path.display()))?;
            serde_json::from_slice::<flatview::ConvertOpts>(&bytes)
                .with_context(|| format!("parse config '{}'", path.display()))?
        }
        None => flatview::ConvertOpts::default(),
    };
    if let Some(codec) = args.codec {
        opts.codec = match codec {
            CodecChoice::H264 => flatview::OutputCodec::H264,
            CodecChoice::Hevc => flatview::OutputCodec::Hevc,
        };
    }
    if let Some(scale) = args.scale {
        opts.backing_scale = scale;
    }
    if let Some(policy) = args.append_policy {
        opts.append_policy = match policy {
            PolicyChoice::Drop => flatview::AppendPolicy::Drop,
            PolicyChoice::Retry => flatview::AppendPolicy::default(),
            PolicyChoice::Abort => flatview::AppendPolicy::Abort,
        };
    }
    if args.overwrite {
        opts.overwrite = true;
    }

    let cancel = flatview::CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let quiet = args.quiet;
    let mut last_pct = -1i64;
    let progress = move |ratio: f64| {
        let pct = (ratio * 100.0).floor() as i64;
        if quiet || pct == last_pct {
            return;
        }
        last_pct = pct;
        let mut err = std::io::stderr();
        let _ = write!(err, "\rconverting: {pct:3}%");
        if pct >= 100 {
            let _ = writeln!(err);
        }
    };

    let finished =
        flatview::convert_spatial_video(&args.in_path, &args.out, opts, progress, cancel)
            .await
            .with_context(|| {
                format!(
                    "convert '{}' -> '{}'",
                    args.in_path.display(),
                    args.out.display()
                )
            })?;

    eprintln!(
        "wrote {} ({} frames, {}, {} dropped, {} incomplete)",
        args.out.display(),
        finished
            .frame_count
            .map_or_else(|| "?".to_string(), |n| n.to_string()),
        finished.duration,
        finished.stats.dropped,
        finished.stats.incomplete
    );
    Ok(())
}
