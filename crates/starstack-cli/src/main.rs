use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use starstack_core::config::PipelineConfig;
use starstack_core::consts::{DEFAULT_FREQ_REMOVAL_WAVELET, DEFAULT_SHEAR_THRESHOLD, DEFAULT_STAR_THRESHOLD_PERCENT};
use starstack_core::flatten::FlattenStrategy;
use starstack_core::io::fits;
use starstack_core::pipeline::run_pipeline;

/// Stack a set of astronomical frames onto a reference image.
#[derive(Parser, Debug)]
#[command(name = "starstack", version, about)]
struct Cli {
    /// Reference frame that every input is registered and resampled against.
    /// Defaults to the first input frame when not given.
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Output path for the stacked mean image.
    #[arg(long)]
    out: PathBuf,

    /// Output path for the per-pixel standard deviation image.
    #[arg(long = "outstdev")]
    out_stdev: Option<PathBuf>,

    /// Skip star detection and affine registration; stack frames as-is.
    #[arg(long)]
    noreg: bool,

    /// Output sampling density relative to the reference frame.
    #[arg(long, default_value_t = 1.0)]
    subsample: f64,

    /// Reject a frame's registration if `|shear|` exceeds this.
    #[arg(long = "shear_threshhold", default_value_t = DEFAULT_SHEAR_THRESHOLD)]
    shear_threshhold: f64,

    /// Percentile of flattened intensity kept ahead of star detection.
    #[arg(long = "star_threshhold", default_value_t = DEFAULT_STAR_THRESHOLD_PERCENT)]
    star_threshhold: f64,

    /// Low-frequency suppression depth passed to the flattener. Defaults
    /// differ by strategy: 4 decomposition levels for the wavelet flattener,
    /// 10 bins for the FFT flattener.
    #[arg(long)]
    freq_removal: Option<u32>,

    /// Use the FFT flattener instead of the default Daubechies-4 wavelet.
    #[arg(long)]
    fft: bool,

    /// Directory to write diagnostic intermediates into, if set.
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Dump the flattened/thresholded image used for star detection.
    #[arg(long)]
    dump_flat: bool,

    /// Dump the detected star centroids.
    #[arg(long)]
    dump_stars: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,

    /// Input frames to stack.
    inputs: Vec<PathBuf>,
}

fn main() -> ExitCode {
    // Parsed manually (rather than `Cli::parse()`) so an unrecognised flag or
    // a malformed numeric argument maps to the spec's -1 exit code instead of
    // clap's own default (2).
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(255);
        }
    };

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if cli.inputs.is_empty() {
        tracing::error!("no input frames given");
        return ExitCode::from(255); // -1 as an unsigned exit code
    }
    if !(0.0..=100.0).contains(&cli.star_threshhold) || !cli.subsample.is_finite() || cli.subsample <= 0.0 {
        tracing::error!("invalid numeric flag: star_threshhold must be 0..100, subsample must be positive");
        return ExitCode::from(255);
    }
    let reference = cli.reference.clone().unwrap_or_else(|| cli.inputs[0].clone());

    let flatten_strategy = if cli.fft { FlattenStrategy::Fft } else { FlattenStrategy::Wavelet };
    let freq_removal = cli.freq_removal.unwrap_or(match flatten_strategy {
        FlattenStrategy::Fft => starstack_core::consts::DEFAULT_FREQ_REMOVAL_FFT,
        FlattenStrategy::Wavelet => DEFAULT_FREQ_REMOVAL_WAVELET,
    });

    let config = PipelineConfig {
        noreg: cli.noreg,
        subsample: cli.subsample,
        shear_threshold: cli.shear_threshhold,
        star_threshold_percent: cli.star_threshhold,
        freq_removal,
        flatten_strategy,
        dump_dir: cli.dump_dir,
        dump_flat: cli.dump_flat,
        dump_stars: cli.dump_stars,
    };

    match run_pipeline(&reference, &cli.inputs, &config) {
        Ok(output) => {
            tracing::info!(
                stacked = output.frames_stacked,
                rejected = output.frames_rejected,
                "stacking complete"
            );
            if let Err(err) = fits::write_image_like_reference(&cli.out, &output.mean, &reference) {
                tracing::error!(error = %err, "failed to write mean output");
                return ExitCode::FAILURE;
            }
            if let Some(stdev_path) = &cli.out_stdev {
                if let Err(err) = fits::write_image_like_reference(stdev_path, &output.stdev, &reference) {
                    tracing::error!(error = %err, "failed to write stdev output");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "stacking run aborted");
            ExitCode::FAILURE
        }
    }
}
