use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use num_rational::Rational64;

use vfr_video_core::shared::error::VideoError;
use vfr_video_core::shared::frame::Frame;
use vfr_video_core::shared::timestamp::Timestamp;
use vfr_video_core::video::domain::image_writer::ImageWriter;
use vfr_video_core::video::domain::video_reader::VideoReader;
use vfr_video_core::video::domain::video_writer::VideoWriter;
use vfr_video_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use vfr_video_core::video::infrastructure::ffmpeg_writer::{FfmpegWriter, WriterConfig};
use vfr_video_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Write and inspect variable-frame-rate videos.
#[derive(Parser)]
#[command(name = "vfr-video")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a synthetic colour-cycling clip with irregular timestamps.
    Synth {
        /// Output video file; the extension picks the container.
        output: PathBuf,

        #[arg(long, default_value = "90")]
        frames: usize,

        /// Base frame rate the timestamps jitter around.
        #[arg(long, default_value = "30.0")]
        fps: f64,

        #[arg(long, default_value = "320")]
        width: u32,

        #[arg(long, default_value = "240")]
        height: u32,

        /// Maximum extra delay added to each frame, in milliseconds.
        #[arg(long, default_value = "0.0")]
        jitter_ms: f64,

        /// Re-send every Kth frame 1 ms later to exercise duplicate skipping.
        #[arg(long)]
        duplicate_every: Option<usize>,
    },
    /// Decode frames in a time range and print their timestamps.
    Read {
        input: PathBuf,

        /// Start time in seconds.
        #[arg(long, default_value = "0.0")]
        start: f64,

        /// End time in seconds (inclusive).
        #[arg(long)]
        end: Option<f64>,

        /// Save each decoded frame as PNG into this directory.
        #[arg(long)]
        dump_dir: Option<PathBuf>,
    },
    /// Print stream metadata.
    Info { input: PathBuf },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Synth {
            output,
            frames,
            fps,
            width,
            height,
            jitter_ms,
            duplicate_every,
        } => {
            validate_synth(fps, width, height, jitter_ms, duplicate_every)?;
            run_synth(&output, frames, fps, (width, height), jitter_ms, duplicate_every)
        }
        Command::Read {
            input,
            start,
            end,
            dump_dir,
        } => {
            require_input(&input)?;
            run_read(&input, start, end, dump_dir.as_deref())
        }
        Command::Info { input } => {
            require_input(&input)?;
            run_info(&input)
        }
    }
}

fn run_synth(
    output: &Path,
    frames: usize,
    fps: f64,
    (width, height): (u32, u32),
    jitter_ms: f64,
    duplicate_every: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = WriterConfig {
        nominal_fps: Some(fps),
        expected_dimensions: Some((width, height)),
    };
    let mut writer = FfmpegWriter::create(output, config)?;

    let mut last_time = 0.0;
    for i in 0..frames {
        let seconds = i as f64 / fps + jitter_offset(i) * jitter_ms / 1000.0;
        let frame = colour_frame(width, height, i);
        let record = writer.write_frame(&frame, seconds_timestamp(seconds)?)?;
        last_time = record.timestamp_f64();

        if duplicate_every.is_some_and(|k| (i + 1) % k == 0) {
            writer.write_frame(&frame, seconds_timestamp(seconds + 0.001)?)?;
        }
        eprint!("\rWriting frame {}/{frames}", i + 1);
    }
    eprintln!();
    writer.close()?;

    println!(
        "{}: {} frames written, {} duplicates skipped, last frame at {last_time:.4}s",
        output.display(),
        writer.frames_written(),
        writer.duplicates_skipped()
    );
    Ok(())
}

fn run_read(
    input: &Path,
    start: f64,
    end: Option<f64>,
    dump_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = FfmpegReader::open(input)?;
    let image_writer: Box<dyn ImageWriter> = Box::new(ImageFileWriter::new());
    if let Some(dir) = dump_dir {
        std::fs::create_dir_all(dir)?;
    }

    let start = seconds_arg(start)?;
    let end = end.map(seconds_arg).transpose()?;

    let mut count = 0;
    for decoded in reader.read_frames(start, end)? {
        let decoded = decoded?;
        println!(
            "pts={:>10} time={:>10.4}s key={}",
            decoded.pts,
            decoded.time_f64(),
            decoded.key_frame
        );
        if let Some(dir) = dump_dir {
            let path = dir.join(format!("frame_{count:06}.png"));
            image_writer.write(&path, &decoded.frame, None)?;
        }
        count += 1;
    }

    log::info!("Decoded {count} frames from {}", input.display());
    if let Some(dir) = dump_dir {
        log::info!("Saved frames to {}", dir.display());
    }
    Ok(())
}

fn run_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let reader = FfmpegReader::open(input)?;
    let metadata = reader.metadata();

    println!("file:        {}", input.display());
    println!("codec:       {}", metadata.codec);
    println!("resolution:  {}x{}", metadata.width, metadata.height);
    println!("time base:   {}", metadata.time_base);
    println!("average fps: {:.3}", metadata.average_fps);
    println!("frames:      {}", metadata.total_frames);
    match metadata.last_frame_time {
        Some(t) => println!("last frame:  {:.4}s", *t.numer() as f64 / *t.denom() as f64),
        None => println!("last frame:  -"),
    }
    Ok(())
}

fn validate_synth(
    fps: f64,
    width: u32,
    height: u32,
    jitter_ms: f64,
    duplicate_every: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(format!("FPS must be positive, got {fps}").into());
    }
    if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
        return Err(format!("Width and height must be positive and even, got {width}x{height}").into());
    }
    if !(0.0..1000.0 / fps).contains(&jitter_ms) {
        return Err(format!(
            "Jitter must be between 0 and one frame interval ({:.1} ms), got {jitter_ms}",
            1000.0 / fps
        )
        .into());
    }
    if duplicate_every == Some(0) {
        return Err("--duplicate-every must be at least 1".into());
    }
    Ok(())
}

fn require_input(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input file not found: {}", input.display()).into());
    }
    Ok(())
}

fn seconds_arg(seconds: f64) -> Result<Rational64, VideoError> {
    match Timestamp::from_secs_f64(seconds) {
        Some(Timestamp::Seconds(s)) => Ok(s),
        _ => Err(VideoError::InvalidTimestamp {
            reason: format!("{seconds} is not a finite number of seconds"),
        }),
    }
}

fn seconds_timestamp(seconds: f64) -> Result<Timestamp, VideoError> {
    seconds_arg(seconds).map(Timestamp::Seconds)
}

/// Deterministic value in [0, 1) so repeated runs produce the same clip.
fn jitter_offset(index: usize) -> f64 {
    ((index as u64).wrapping_mul(2_654_435_761) % 1000) as f64 / 1000.0
}

fn colour_frame(width: u32, height: u32, index: usize) -> Frame {
    let phase = (index % 60) as f64 / 60.0 * std::f64::consts::TAU;
    let channel = |offset: f64| (127.5 + 127.5 * (phase + offset).sin()) as u8;
    let rgb = [channel(0.0), channel(2.1), channel(4.2)];

    let data = rgb
        .iter()
        .copied()
        .cycle()
        .take((width * height * 3) as usize)
        .collect();
    Frame::rgb(data, width, height)
}
