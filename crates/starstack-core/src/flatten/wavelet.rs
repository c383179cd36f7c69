//! Daubechies-4 wavelet low-frequency suppression.
//!
//! The image is padded to a square power-of-two size (new cells filled with
//! the image median so the padding doesn't itself look like a bright edge),
//! decomposed `freq_removal` levels deep with a separable row-then-column
//! transform, the coarsest LL subband zeroed, and the transform inverted.
//! The result is cropped back to the original shape.

use ndarray::{s, Array2};

use crate::consts::DAUBECHIES4_TAPS;
use crate::image::{median_all, next_power_of_two, Image};

/// Spec §4.2: full decomposition recurses down to length 2; a level is only
/// taken if the next extent would still be at least this long.
const LEVEL_FLOOR: usize = 2;

/// Zero the coarsest `freq_removal`-level LL subband and invert.
/// `freq_removal` of 0 leaves the image unchanged.
pub fn suppress_low_frequency(image: &Image, freq_removal: u32) -> Image {
    let (rows, cols) = image.dim();
    if freq_removal == 0 || rows == 0 || cols == 0 {
        return image.clone();
    }

    let size = next_power_of_two(rows.max(cols));
    let fill = median_all(image);
    let mut padded = Array2::from_elem((size, size), fill);
    padded.slice_mut(s![0..rows, 0..cols]).assign(image);

    let mut levels = 0usize;
    let mut extent = size;
    while levels < freq_removal as usize && extent / 2 >= LEVEL_FLOOR {
        decompose_2d(&mut padded, extent);
        extent /= 2;
        levels += 1;
    }

    padded.slice_mut(s![0..extent, 0..extent]).fill(0.0);

    for _ in 0..levels {
        extent *= 2;
        reconstruct_2d(&mut padded, extent);
    }

    padded.slice(s![0..rows, 0..cols]).to_owned()
}

fn analysis_filters() -> ([f64; 4], [f64; 4]) {
    // Normalize to unit energy (sum sqrt(2)) so the filter bank is orthogonal
    // and the reconstruction below is an exact transpose of decomposition.
    let scale = 1.0 / std::f64::consts::SQRT_2;
    let h = DAUBECHIES4_TAPS.map(|t| t * scale);
    let g = [h[3], -h[2], h[1], -h[0]];
    (h, g)
}

fn forward_1d(x: &[f64], out: &mut [f64]) {
    let n = x.len();
    let half = n / 2;
    let (h, g) = analysis_filters();
    for i in 0..half {
        let i0 = 2 * i;
        let i1 = (2 * i + 1) % n;
        let i2 = (2 * i + 2) % n;
        let i3 = (2 * i + 3) % n;
        out[i] = h[0] * x[i0] + h[1] * x[i1] + h[2] * x[i2] + h[3] * x[i3];
        out[half + i] = g[0] * x[i0] + g[1] * x[i1] + g[2] * x[i2] + g[3] * x[i3];
    }
}

fn inverse_1d(coeffs: &[f64], out: &mut [f64]) {
    let n = coeffs.len();
    let half = n / 2;
    let (h, g) = analysis_filters();
    out.iter_mut().for_each(|v| *v = 0.0);
    for i in 0..half {
        let low = coeffs[i];
        let high = coeffs[half + i];
        let i0 = 2 * i;
        let i1 = (2 * i + 1) % n;
        let i2 = (2 * i + 2) % n;
        let i3 = (2 * i + 3) % n;
        out[i0] += h[0] * low + g[0] * high;
        out[i1] += h[1] * low + g[1] * high;
        out[i2] += h[2] * low + g[2] * high;
        out[i3] += h[3] * low + g[3] * high;
    }
}

/// One level of separable forward transform over the top-left `extent x extent`
/// block of `image`, in place.
fn decompose_2d(image: &mut Array2<f64>, extent: usize) {
    let mut row_buf = vec![0.0f64; extent];
    let mut scratch = vec![0.0f64; extent];
    for r in 0..extent {
        for c in 0..extent {
            row_buf[c] = image[[r, c]];
        }
        forward_1d(&row_buf, &mut scratch);
        for c in 0..extent {
            image[[r, c]] = scratch[c];
        }
    }
    let mut col_buf = vec![0.0f64; extent];
    for c in 0..extent {
        for r in 0..extent {
            col_buf[r] = image[[r, c]];
        }
        forward_1d(&col_buf, &mut scratch);
        for r in 0..extent {
            image[[r, c]] = scratch[r];
        }
    }
}

/// Inverse of [`decompose_2d`] for the same `extent`, applied columns-then-rows
/// (reverse order of the forward pass).
fn reconstruct_2d(image: &mut Array2<f64>, extent: usize) {
    let mut col_buf = vec![0.0f64; extent];
    let mut scratch = vec![0.0f64; extent];
    for c in 0..extent {
        for r in 0..extent {
            col_buf[r] = image[[r, c]];
        }
        inverse_1d(&col_buf, &mut scratch);
        for r in 0..extent {
            image[[r, c]] = scratch[r];
        }
    }
    let mut row_buf = vec![0.0f64; extent];
    for r in 0..extent {
        for c in 0..extent {
            row_buf[c] = image[[r, c]];
        }
        inverse_1d(&row_buf, &mut scratch);
        for c in 0..extent {
            image[[r, c]] = scratch[c];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn round_trip_without_zeroing_preserves_image() {
        let image = Array2::from_shape_fn((16, 16), |(r, c)| (r as f64 * 1.3 + c as f64 * 0.7).sin() * 50.0 + 100.0);
        let mut padded = image.clone();
        decompose_2d(&mut padded, 16);
        reconstruct_2d(&mut padded, 16);
        for (a, b) in image.iter().zip(padded.iter()) {
            assert!((a - b).abs() < 1e-6, "round trip mismatch: {a} vs {b}");
        }
    }

    #[test]
    fn zero_removal_is_identity() {
        let image = Array2::from_shape_fn((16, 16), |(r, c)| (r * 16 + c) as f64);
        let out = suppress_low_frequency(&image, 0);
        assert_eq!(out, image);
    }

    #[test]
    fn flattens_constant_background() {
        let image = Array2::from_elem((32, 32), 250.0);
        let out = suppress_low_frequency(&image, 3);
        for &v in out.iter() {
            assert!(v.abs() < 1e-6, "expected near-zero residual, got {v}");
        }
    }
}
