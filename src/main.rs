use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ball_kinematics::logging::init_logging;
use ball_kinematics::overlay::annotate_outcome;
use ball_kinematics::{
    export_filtered_to_csv, AnalysisConfig, AnalysisSummary, FrameSequencer, RunEnd,
    VideoFileSource,
};

/// Estimate the acceleration of a colored ball rolling down an incline.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Video file to analyze
    video: PathBuf,

    /// Spacing between analysed frames in milliseconds (minimum 1)
    #[arg(long, default_value_t = 10.0)]
    step_ms: f64,

    /// Incline angle in degrees, for the theoretical acceleration
    #[arg(long, default_value_t = 0.0)]
    angle: f64,

    /// Time dilation factor for slow-motion footage (e.g. 0.25)
    #[arg(long, default_value_t = 1.0)]
    slow_motion: f64,

    /// Ball diameter in meters
    #[arg(long, default_value_t = 0.15)]
    diameter: f64,

    /// Write the filtered samples to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Save annotated frames (PNG) into this directory
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Log verbosity: 0=off, 1=error, 2=warn, 3=info, 4=debug, 5=trace
    #[arg(long, default_value_t = 3)]
    log_level: i32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level);

    let config = AnalysisConfig {
        reference_diameter_m: args.diameter,
        frame_step_ms: args.step_ms,
        slope_angle_deg: args.angle,
        slow_motion_factor: args.slow_motion,
        log_level: args.log_level,
        ..AnalysisConfig::default()
    };

    let video_path = args
        .video
        .to_str()
        .context("video path is not valid UTF-8")?;
    let mut source =
        VideoFileSource::open(video_path).with_context(|| format!("opening {}", video_path))?;

    if let Some(dir) = &args.overlay_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating overlay directory {}", dir.display()))?;
    }

    let sequencer = FrameSequencer::new(config);
    let report = sequencer.run_observed(
        &mut source,
        |p| log::debug!("Progress: {:.0}%", p * 100.0),
        |frame, outcome| {
            let Some(dir) = &args.overlay_dir else {
                return;
            };
            let mut image = frame.image.clone();
            annotate_outcome(&mut image, outcome);
            let path = dir.join(format!("frame_{:05}.png", outcome.index));
            if let Err(e) = image.save(&path) {
                log::warn!("Could not save {}: {}", path.display(), e);
            }
        },
    );

    if let RunEnd::Faulted(reason) = &report.end {
        log::warn!("Analysis stopped early: {}", reason);
    }

    println!("{}", AnalysisSummary::from_report(&report));
    if let Some(scale) = report.px_to_meter {
        println!("Scale: {:.6} m/px", scale);
    }

    if let Some(csv_path) = &args.csv {
        if report.filtered_samples.is_empty() {
            log::warn!("No filtered samples; CSV not written");
        } else {
            export_filtered_to_csv(csv_path, &report.filtered_samples)
                .with_context(|| format!("writing {}", csv_path.display()))?;
        }
    }

    Ok(())
}
