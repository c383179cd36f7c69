use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use ndarray::Array2;
use tempfile::tempdir;

use starstack_core::config::PipelineConfig;
use starstack_core::flatten::FlattenStrategy;
use starstack_core::pipeline::run_pipeline;

fn write_fits(path: &std::path::Path, image: &Array2<f64>) {
    let (rows, cols) = image.dim();
    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &[rows, cols],
    };
    let mut fptr = FitsFile::create(path).open().unwrap();
    let hdu = fptr.create_image("PRIMARY".to_string(), &description).unwrap();
    let contiguous: Vec<f64> = image.iter().copied().collect();
    hdu.write_image(&mut fptr, &contiguous).unwrap();
}

/// Six well-separated star positions (row, col) on a 160x160 canvas, far
/// enough apart that a small whole-frame shift never changes which blob is
/// whose nearest neighbour. ICP's per-iteration match count is
/// `min(|R|, |S|) / 2` (spec §4.4), so six stars is the minimum that leaves
/// a full-rank (3-pair) affine fit.
const STAR_POSITIONS: [(usize, usize); 6] =
    [(20, 20), (20, 140), (140, 20), (140, 140), (80, 80), (20, 80)];

/// A flat background with one bright, well-isolated blob per [`STAR_POSITIONS`]
/// entry, each offset by `(dr, dc)`, that the star detector can pick up as
/// distinct centroids.
fn frame_with_stars(dr: isize, dc: isize) -> Array2<f64> {
    let mut image = Array2::from_elem((160, 160), 100.0);
    for &(row, col) in &STAR_POSITIONS {
        let row = (row as isize + dr) as usize;
        let col = (col as isize + dc) as usize;
        for r in 0..7 {
            for c in 0..7 {
                image[[row + r, col + c]] = 5000.0;
            }
        }
    }
    image
}

#[test]
fn noreg_stacks_two_identical_frames_without_registration() {
    let dir = tempdir().unwrap();
    let reference_path = dir.path().join("reference.fits");
    let frame_path = dir.path().join("frame.fits");

    let image = frame_with_stars(0, 0);
    write_fits(&reference_path, &image);
    write_fits(&frame_path, &image);

    let config = PipelineConfig {
        noreg: true,
        ..PipelineConfig::default()
    };

    let output = run_pipeline(&reference_path, &[frame_path], &config).unwrap();
    assert_eq!(output.frames_stacked, 1);
    assert_eq!(output.frames_rejected, 0);
    for (&mean, &original) in output.mean.iter().zip(image.iter()) {
        assert!((mean - original).abs() < 1e-6);
    }
    assert!(output.stdev.iter().all(|&v| v.abs() < 1e-6));
}

#[test]
fn registered_translated_frame_aligns_back_onto_reference() {
    let dir = tempdir().unwrap();
    let reference_path = dir.path().join("reference.fits");
    let frame_path = dir.path().join("frame.fits");

    let reference = frame_with_stars(0, 0);
    let shifted = frame_with_stars(4, 0);
    write_fits(&reference_path, &reference);
    write_fits(&frame_path, &shifted);

    let config = PipelineConfig {
        flatten_strategy: FlattenStrategy::Wavelet,
        star_threshold_percent: 5.0,
        ..PipelineConfig::default()
    };

    let output = run_pipeline(&reference_path, &[frame_path], &config).unwrap();
    assert_eq!(output.frames_stacked, 1);

    // The resampled frame should land each bright blob back near its
    // un-shifted reference position rather than 4 rows down, within a
    // couple of pixels of interpolation slop.
    for &(row, col) in &STAR_POSITIONS {
        let center = output.mean[[row + 3, col + 3]];
        assert!(
            center > 2000.0,
            "expected blob centered near ({row}, {col}) to survive registration, got {center}"
        );
    }
}

#[test]
fn missing_reference_file_aborts_the_run() {
    let dir = tempdir().unwrap();
    let reference_path = dir.path().join("does-not-exist.fits");
    let config = PipelineConfig::default();
    let inputs: Vec<std::path::PathBuf> = vec![];
    let result = run_pipeline(&reference_path, &inputs, &config);
    assert!(result.is_err());
}
