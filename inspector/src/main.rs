mod render;
mod synth;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use termdelta_core::{
    DiffOptions, DiffPipeline, FrameType, PipelineConfig, StreamReader, StreamWriter, Viewport,
    DEFAULT_COLOR_TOLERANCE,
};

use crate::render::render_text;
use crate::synth::wave_frame;

#[derive(Parser)]
#[command(name = "termdelta-inspect", about = "Build and inspect terminal frame-diff streams")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Diff a synthetic animation frame by frame and write the stream
    Generate {
        /// Output stream path
        output: PathBuf,

        /// Terminal columns
        #[arg(long, default_value = "80")]
        cols: u16,

        /// Terminal rows
        #[arg(long, default_value = "24")]
        rows: u16,

        /// Number of frames to generate
        #[arg(long, default_value = "120")]
        frames: u32,

        /// Frames per second recorded in the header
        #[arg(long, default_value = "30")]
        fps: u16,

        /// RGB distance (0.0-1.0 channels) under which colors count as unchanged
        #[arg(long, default_value_t = DEFAULT_COLOR_TOLERANCE)]
        tolerance: f32,

        /// Keyframe interval (frames between full keyframes, 0 = first only)
        #[arg(long, default_value = "30")]
        keyframe_interval: u32,

        /// Diff cells outside the viewport too
        #[arg(long)]
        include_out_of_bounds: bool,
    },

    /// Print the stream header and a line per frame
    Info {
        /// Input stream path
        input: PathBuf,
    },

    /// Print the screen as it looks after a frame, as plain text
    Replay {
        /// Input stream path
        input: PathBuf,

        /// Frame to stop at (default: last)
        #[arg(long)]
        frame: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command {
        Command::Generate {
            output,
            cols,
            rows,
            frames,
            fps,
            tolerance,
            keyframe_interval,
            include_out_of_bounds,
        } => {
            let options = DiffOptions::new(cols, rows)
                .with_color_tolerance(tolerance)
                .with_include_out_of_bounds(include_out_of_bounds);
            let config = PipelineConfig {
                keyframe_interval,
                ..PipelineConfig::default()
            };
            generate(&output, options, config, frames, fps)
        }
        Command::Info { input } => info(&input),
        Command::Replay { input, frame } => replay(&input, frame),
    }
}

fn generate(
    output: &Path,
    options: DiffOptions,
    config: PipelineConfig,
    frames: u32,
    fps: u16,
) -> anyhow::Result<()> {
    let Viewport { width: cols, height: rows } = options.viewport;
    let mut pipeline = DiffPipeline::new(config, options).context("invalid diff options")?;

    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = StreamWriter::new(BufWriter::new(file), cols, rows, fps)?;

    let mut keyframes = 0u32;
    let mut updates = 0usize;
    for t in 0..frames {
        let step = pipeline.push(wave_frame(cols, rows, t), options.viewport)?;
        if step.diff.frame_type() == FrameType::Keyframe {
            keyframes += 1;
        }
        updates += step.diff.updates().len();
        writer.write_diff(&step.diff)?;

        if (t + 1) % 100 == 0 {
            tracing::info!(frames = pipeline.frames_pushed(), "generating");
        }
    }

    let written = writer.frames_written();
    writer.finish()?;
    eprintln!(
        "Wrote {} ({written} frames, {keyframes} keyframes, {updates} cell updates)",
        output.display()
    );
    Ok(())
}

fn open(input: &Path) -> anyhow::Result<StreamReader<BufReader<File>>> {
    let file = File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    StreamReader::new(BufReader::new(file))
        .with_context(|| format!("failed to read stream header from {}", input.display()))
}

fn info(input: &Path) -> anyhow::Result<()> {
    let mut reader = open(input)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    writeln!(out, "grid:   {}x{} cells", reader.header.cols, reader.header.rows)?;
    let (extent_cols, extent_rows) = reader.header.addressable();
    writeln!(out, "extent: {extent_cols}x{extent_rows} cells")?;
    writeln!(out, "fps:    {}", reader.fps())?;
    writeln!(out, "frames: {}", reader.frame_count())?;

    for idx in 0..reader.frame_count() {
        let entry = reader.index[idx];
        let updates = reader
            .read_frame(idx)
            .with_context(|| format!("failed to decode frame {idx}"))?;
        let kind = match entry.frame_type {
            FrameType::Keyframe => "key",
            FrameType::Delta => "delta",
        };
        writeln!(
            out,
            "{idx:>6} {kind:<5} {:>7} updates {:>8} bytes",
            updates.len(),
            entry.compressed_size
        )?;
    }

    out.flush()?;
    Ok(())
}

fn replay(input: &Path, frame: Option<usize>) -> anyhow::Result<()> {
    let mut reader = open(input)?;
    if reader.frame_count() == 0 {
        anyhow::bail!("{} contains no frames", input.display());
    }
    let frame = frame.unwrap_or(reader.frame_count() - 1);
    let screen = reader
        .replay(frame)
        .with_context(|| format!("failed to replay up to frame {frame}"))?;

    let mut text = String::new();
    render_text(&screen, &mut text);
    io::stdout().lock().write_all(text.as_bytes())?;
    Ok(())
}
