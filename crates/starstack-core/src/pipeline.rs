//! End-to-end stacking driver (spec §4.7).
//!
//! Registration direction: [`icp::icp_solve`] as a function solves
//! `reference ≈ G · source`. This driver calls it as
//! `icp_solve(frame_stars, pipeline_reference_stars, guess)` — arguments
//! swapped relative to the pipeline's own reference/frame roles — so the
//! returned `G` satisfies `frame ≈ G · pipeline_reference`, which is exactly
//! the transform [`resample::affine_resample`] needs: for each pixel on the
//! reference grid, apply `G` to find where that location landed in the
//! current frame, and sample the frame there. See `DESIGN.md` for the full
//! derivation and the original call site it mirrors.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::badpixel::remove_bad_pixels;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::flatten::{suppress_low_frequency, threshold_percentile};
use crate::icp::{icp_solve, stars_to_points, Affine};
use crate::image::Image;
use crate::io::fits;
use crate::resample::affine_resample;
use crate::stack::RunningStack;
use crate::stars::{find_stars, Star};

/// Probe `{dir}/{basename}{N}.fits` for the smallest `N >= 1` not already on
/// disk, mirroring the original implementation's numbered-dump convention.
fn next_dump_path(dir: &Path, basename: &str) -> PathBuf {
    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{basename}{n}.fits"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn dump_image(config: &PipelineConfig, basename: &str, image: &Image) {
    let Some(dir) = &config.dump_dir else { return };
    let path = next_dump_path(dir, basename);
    match fits::write_image(&path, image) {
        Ok(()) => info!(?path, "dumped diagnostic image"),
        Err(err) => warn!(?path, error = %err, "failed to write diagnostic dump"),
    }
}

/// Render detected star centroids as a sparse image (brightness at the
/// nearest pixel to each centroid) so they can be dumped through the same
/// FITS writer as any other diagnostic image.
fn stars_to_mask(stars: &[Star], rows: usize, cols: usize) -> Image {
    let mut mask = Image::zeros((rows, cols));
    for star in stars {
        let r = star.row.round();
        let c = star.col.round();
        if r >= 0.0 && c >= 0.0 && (r as usize) < rows && (c as usize) < cols {
            mask[[r as usize, c as usize]] = star.brightness;
        }
    }
    mask
}

/// The accumulated result of stacking every accepted frame against a reference.
pub struct PipelineOutput {
    pub mean: Image,
    pub stdev: Image,
    pub frames_stacked: u64,
    pub frames_rejected: u64,
}

/// Run the full pipeline: load the reference, detect its stars once, then
/// for each input frame repair bad pixels, optionally register against the
/// reference, and fold the result into a running mean/stdev.
pub fn run_pipeline(
    reference_path: &Path,
    input_paths: &[impl AsRef<Path>],
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    let reference_raw = fits::read_image(reference_path)?;
    let (reference_clean, _) = remove_bad_pixels(&reference_raw);
    let (ref_rows, ref_cols) = reference_clean.dim();
    // Spec §4.5: output shape is ceil(rows*s) x ceil(cols*s) at the given
    // subsample density, not the reference's native shape.
    let out_rows = (ref_rows as f64 * config.subsample).ceil() as usize;
    let out_cols = (ref_cols as f64 * config.subsample).ceil() as usize;

    let reference_stars = if config.noreg {
        Vec::new()
    } else {
        let flattened = suppress_low_frequency(&reference_clean, config.flatten_strategy, config.freq_removal);
        let mut thresholded = threshold_percentile(&flattened, config.star_threshold_percent);
        if config.dump_flat {
            dump_image(config, "flat_reference", &thresholded);
        }
        let stars = find_stars(&mut thresholded);
        if config.dump_stars {
            dump_image(config, "stars_reference", &stars_to_mask(&stars, ref_rows, ref_cols));
        }
        stars
    };
    let reference_points = stars_to_points(&reference_stars);
    info!(count = reference_stars.len(), "detected reference stars");

    let mut stack = RunningStack::new(out_rows, out_cols);
    let mut guess = Affine::IDENTITY;
    let mut rejected = 0u64;

    for path in input_paths {
        let path = path.as_ref();
        let raw = match fits::read_image(path) {
            Ok(image) => image,
            Err(err) => {
                warn!(?path, error = %err, "skipping unreadable frame");
                rejected += 1;
                continue;
            }
        };
        let (clean, _) = remove_bad_pixels(&raw);

        let transform = if config.noreg {
            Affine::IDENTITY
        } else {
            let flattened = suppress_low_frequency(&clean, config.flatten_strategy, config.freq_removal);
            let mut thresholded = threshold_percentile(&flattened, config.star_threshold_percent);
            if config.dump_flat {
                dump_image(config, "flat", &thresholded);
            }
            let frame_stars = find_stars(&mut thresholded);
            if config.dump_stars {
                dump_image(config, "stars", &stars_to_mask(&frame_stars, clean.dim().0, clean.dim().1));
            }
            let frame_points = stars_to_points(&frame_stars);

            match icp_solve(&frame_points, &reference_points, guess) {
                Ok(transform) => {
                    let shear = transform.shear();
                    if shear.abs() > config.shear_threshold {
                        warn!(?path, shear, "rejecting frame: shear exceeds threshold");
                        rejected += 1;
                        continue;
                    }
                    guess = transform;
                    transform
                }
                Err(err) => {
                    warn!(?path, error = %err, "rejecting frame: registration failed");
                    rejected += 1;
                    continue;
                }
            }
        };

        let resampled = affine_resample(&clean, &transform, out_rows, out_cols, config.subsample);
        stack.push(&resampled)?;
        info!(?path, "stacked frame");
    }

    Ok(PipelineOutput {
        mean: stack.mean().clone(),
        stdev: stack.stdev(),
        frames_stacked: stack.count(),
        frames_rejected: rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_registration_enabled() {
        let config = PipelineConfig::default();
        assert!(!config.noreg);
    }
}
