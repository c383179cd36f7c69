//! Low-frequency suppression ("flattening") ahead of star detection (spec §4.2).
//!
//! Two interchangeable strategies remove the smooth background gradient from
//! a frame: an FFT-domain notch ([`fft`]) and a Daubechies-4 wavelet coarse-scale
//! zeroing ([`wavelet`]). Both leave a residual that is still mostly background
//! noise near zero with stars standing out as positive spikes; [`threshold_percentile`]
//! turns that residual into the final non-negative map used for flood fill.

pub mod fft;
pub mod wavelet;

use crate::image::Image;

/// Selects which low-frequency suppression strategy [`suppress_low_frequency`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlattenStrategy {
    Fft,
    Wavelet,
}

/// Remove the low-frequency background from `image`, leaving a residual
/// dominated by high-frequency detail (star cores, noise).
///
/// `freq_removal` is strategy-specific: for [`FlattenStrategy::Fft`] it is the
/// half-width (in bins) of the wrap-around low-frequency box zeroed in the
/// spectrum; for [`FlattenStrategy::Wavelet`] it is the number of decomposition
/// levels whose coarse (LL) subband is zeroed.
pub fn suppress_low_frequency(image: &Image, strategy: FlattenStrategy, freq_removal: u32) -> Image {
    match strategy {
        FlattenStrategy::Fft => fft::suppress_low_frequency(image, freq_removal),
        FlattenStrategy::Wavelet => wavelet::suppress_low_frequency(image, freq_removal),
    }
}

/// Keep only the pixels in the top `percent` of the intensity distribution,
/// shifted down so the cutoff sits at zero: `out = max(value - t, 0)`, where
/// `t` is the `floor(size*p/100)`-th value counting down from the brightest
/// pixel — the same index `ReversePercentile`
/// (`original_source/AstropressPlus/StarFinder.cpp`) selects via
/// `nth_element(..., std::greater<int>())`.
pub fn threshold_percentile(image: &Image, percent: f64) -> Image {
    let percent = percent.clamp(0.0, 100.0);
    let mut values: Vec<f64> = image.iter().copied().collect();
    let n = values.len();
    if n == 0 {
        return image.clone();
    }
    let rank = (((n as f64) * percent / 100.0).floor() as usize).min(n - 1);
    values.select_nth_unstable_by(rank, |a, b| b.partial_cmp(a).unwrap());
    let t = values[rank];
    image.mapv(|v| (v - t).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn threshold_percentile_is_non_negative() {
        let image = Array2::from_shape_fn((16, 16), |(r, c)| (r as f64 - c as f64) * 3.7);
        let out = threshold_percentile(&image, 5.0);
        assert!(out.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn threshold_percentile_keeps_peak() {
        let mut image = Array2::from_elem((16, 16), 0.0);
        image[[8, 8]] = 1000.0;
        let out = threshold_percentile(&image, 1.0);
        assert!(out[[8, 8]] > 0.0);
    }
}
