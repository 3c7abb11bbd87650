use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use blobfinder_core::compute::ArrayBackend;
use blobfinder_core::correlation::{round_peaks, PreScale, ZeroShift};
use blobfinder_core::frame::Frame;
use blobfinder_core::pipeline::config::{CorrelationConfig, Strategy, Upsample};
use blobfinder_core::pipeline::run_with_progress;
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::io::{load_intensities, results_csv, to_frame};
use crate::job::JobConfig;
use crate::pattern_args::PatternArgs;
use crate::summary::{print_frame_results, print_job_summary};

#[derive(Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Fast,
    FullFrame,
    Sparse,
}

#[derive(Args)]
pub struct RunArgs {
    /// Input frames (any format the image crate reads)
    #[arg(required = true)]
    pub frames: Vec<PathBuf>,

    /// Job file (TOML); replaces all other correlation options
    #[arg(long)]
    pub job: Option<PathBuf>,

    /// Expected peak position as "row,col"; repeat for every peak
    #[arg(long = "peak", value_name = "ROW,COL")]
    pub peaks: Vec<String>,

    #[command(flatten)]
    pub pattern: PatternArgs,

    /// Correlation strategy
    #[arg(long, value_enum, default_value = "fast")]
    pub strategy: StrategyArg,

    /// Offsets searched per axis by the sparse strategy
    #[arg(long, default_value = "3")]
    pub steps: usize,

    /// DFT upsampling factor for sub-pixel refinement (parabola fit if omitted)
    #[arg(long, num_args = 0..=1, default_missing_value = "20")]
    pub upsample: Option<usize>,

    /// Array backend: dense, gpu, sparse-coo or sparse-compressed
    #[arg(long, default_value = "dense")]
    pub backend: String,

    /// Global zero shift as "row,col"
    #[arg(long, value_name = "ROW,COL")]
    pub zero_shift: Option<String>,

    /// Correlate raw intensities instead of log-scaled ones
    #[arg(long)]
    pub no_prescale: bool,

    /// Peaks with an elevation below this are shown as weak
    #[arg(long, default_value = "0.1")]
    pub weak_elevation: f32,

    /// Write all results as CSV
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let job = if let Some(ref job_path) = args.job {
        let contents = std::fs::read_to_string(job_path)
            .with_context(|| format!("Failed to read job file {}", job_path.display()))?;
        toml::from_str(&contents).context("Invalid job file")?
    } else {
        build_job_from_args(args)?
    };

    print_job_summary(&job, args.frames.len());

    let backend = job.correlation.backend;
    let frames: Vec<Frame> = args
        .frames
        .iter()
        .map(|path| load_intensities(path).map(|data| to_frame(data, backend)))
        .collect::<Result<_>>()?;
    info!(frames = frames.len(), %backend, "Frames loaded");

    let peaks = round_peaks(&job.peaks);
    let zero_shift = job.zero_shift.map(ZeroShift::Global).unwrap_or_default();

    let pb = ProgressBar::new(frames.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Correlating [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );

    let results = run_with_progress(
        &frames,
        &peaks,
        &job.pattern,
        &job.correlation,
        &zero_shift,
        |done| pb.set_position(done as u64),
    )?;
    pb.finish();
    println!();

    for frame in 0..results.n_frames() {
        print_frame_results(&results, frame, args.weak_elevation);
    }

    if let Some(ref path) = args.output {
        std::fs::write(path, results_csv(&results))
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        println!("Results saved to {}", path.display());
    }

    Ok(())
}

fn build_job_from_args(args: &RunArgs) -> Result<JobConfig> {
    if args.peaks.is_empty() {
        bail!("No peaks given; pass --peak ROW,COL or a --job file");
    }
    let peaks = args
        .peaks
        .iter()
        .map(|s| parse_pair(s))
        .collect::<Result<Vec<_>>>()?;
    let zero_shift = args.zero_shift.as_deref().map(parse_pair).transpose()?;

    let strategy = match args.strategy {
        StrategyArg::Fast => Strategy::Fast,
        StrategyArg::FullFrame => Strategy::FullFrame,
        StrategyArg::Sparse => Strategy::Sparse { steps: args.steps },
    };

    Ok(JobConfig {
        peaks,
        zero_shift,
        pattern: args.pattern.to_pattern(),
        correlation: CorrelationConfig {
            backend: args.backend.parse::<ArrayBackend>()?,
            upsample: args.upsample.map(Upsample::Factor).unwrap_or_default(),
            prescale: if args.no_prescale {
                PreScale::None
            } else {
                PreScale::Log
            },
            strategy,
            ..CorrelationConfig::default()
        },
    })
}

/// Parse "row,col".
fn parse_pair(s: &str) -> Result<[f64; 2]> {
    let (row, col) = s
        .split_once(',')
        .with_context(|| format!("Expected ROW,COL, got {s:?}"))?;
    let row = row.trim().parse().with_context(|| format!("Invalid row in {s:?}"))?;
    let col = col.trim().parse().with_context(|| format!("Invalid column in {s:?}"))?;
    Ok([row, col])
}

#[cfg(test)]
mod tests {
    use super::parse_pair;

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("12, 7.5").unwrap(), [12.0, 7.5]);
        assert_eq!(parse_pair("-3,4").unwrap(), [-3.0, 4.0]);
        assert!(parse_pair("12").is_err());
        assert!(parse_pair("a,1").is_err());
    }
}
