//! Affine resampling onto the reference grid (spec §4.5).

use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::icp::Affine;
use crate::image::Image;

/// Resample `source` onto a grid of shape `(out_rows, out_cols)` at `subsample`
/// density, using `transform` to map each output pixel back into source
/// coordinates and bilinear-sampling there. Output pixels whose mapped source
/// coordinate falls outside `source`'s bounds are filled with zero.
pub fn affine_resample(
    source: &Image,
    transform: &Affine,
    out_rows: usize,
    out_cols: usize,
    subsample: f64,
) -> Image {
    if out_rows * out_cols >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<f64>> = (0..out_rows)
            .into_par_iter()
            .map(|r| resample_row(source, transform, r, out_cols, subsample))
            .collect();
        let mut output = Image::zeros((out_rows, out_cols));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, v) in row.into_iter().enumerate() {
                output[[r, c]] = v;
            }
        }
        output
    } else {
        let mut output = Image::zeros((out_rows, out_cols));
        for r in 0..out_rows {
            for (c, v) in resample_row(source, transform, r, out_cols, subsample).into_iter().enumerate() {
                output[[r, c]] = v;
            }
        }
        output
    }
}

fn resample_row(source: &Image, transform: &Affine, row: usize, out_cols: usize, subsample: f64) -> Vec<f64> {
    let mut out = vec![0.0; out_cols];
    for col in 0..out_cols {
        let x = col as f64 / subsample;
        let y = row as f64 / subsample;
        let (sx, sy) = transform.apply(x, y);
        out[col] = bilinear_sample(source, sx, sy);
    }
    out
}

/// Sample `image` at fractional (col, row) coordinates `(x, y)` via bilinear
/// interpolation of the four surrounding integer pixels. Any of the four
/// falling outside the image bounds contributes zero instead of being
/// clamped, so edges fade rather than repeat.
pub fn bilinear_sample(image: &Image, x: f64, y: f64) -> f64 {
    let (rows, cols) = image.dim();
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let at = |r: isize, c: isize| -> f64 {
        if r < 0 || c < 0 || r as usize >= rows || c as usize >= cols {
            0.0
        } else {
            image[[r as usize, c as usize]]
        }
    };

    let col0 = x0 as isize;
    let row0 = y0 as isize;

    let top = at(row0, col0) * (1.0 - fx) + at(row0, col0 + 1) * fx;
    let bottom = at(row0 + 1, col0) * (1.0 - fx) + at(row0 + 1, col0 + 1) * fx;
    top * (1.0 - fy) + bottom * fy
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn identity_transform_reproduces_source() {
        let source = Array2::from_shape_fn((20, 20), |(r, c)| (r * 20 + c) as f64);
        let out = affine_resample(&source, &Affine::IDENTITY, 20, 20, 1.0);
        for r in 0..20 {
            for c in 0..20 {
                assert!((out[[r, c]] - source[[r, c]]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn out_of_bounds_samples_are_zero() {
        let source = Array2::from_elem((10, 10), 42.0);
        assert_eq!(bilinear_sample(&source, -1.0, 5.0), 0.0);
        assert_eq!(bilinear_sample(&source, 5.0, 20.0), 0.0);
    }

    #[test]
    fn bilinear_interpolates_between_neighbors() {
        let mut source = Array2::from_elem((4, 4), 0.0);
        source[[1, 1]] = 10.0;
        source[[1, 2]] = 20.0;
        source[[2, 1]] = 10.0;
        source[[2, 2]] = 20.0;
        let sampled = bilinear_sample(&source, 1.5, 1.5);
        assert!((sampled - 15.0).abs() < 1e-9);
    }
}
