use ndarray::Array2;

/// A dense 2-D array of calibrated intensity values.
///
/// Thin wrapper over `ndarray::Array2<f64>`; row/column views come for free
/// from `ndarray` (`.row(i)`, `.column(i)`). Negative values are legal
/// intermediate results (e.g. after background subtraction), so no
/// non-negativity invariant is enforced here.
pub type Image = Array2<f64>;

/// Shape as `(rows, cols)`.
pub fn shape(image: &Image) -> (usize, usize) {
    image.dim()
}

/// Minimum and maximum pixel value. Panics if the image is empty.
pub fn min_max(image: &Image) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in image.iter() {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    (min, max)
}

/// The 4th order statistic (median) of exactly 8 values, via `select_nth_unstable_by`.
/// Ties are broken by insertion order, which does not affect correctness since
/// equal-valued neighbours yield equal candidates (spec §4.1).
pub fn median_of_8(values: &mut [f64; 8]) -> f64 {
    values.select_nth_unstable_by(4, |a, b| a.partial_cmp(b).unwrap());
    values[4]
}

/// Next power of two `>= n`, with a floor of 1.
pub fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Median of all pixel values. Used to pad images for the wavelet flattener.
pub fn median_all(image: &Image) -> f64 {
    let mut values: Vec<f64> = image.iter().copied().collect();
    let mid = values.len() / 2;
    values.select_nth_unstable_by(mid, |a, b| a.partial_cmp(b).unwrap());
    values[mid]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_8_is_order_independent() {
        let mut a = [8.0, 1.0, 6.0, 2.0, 5.0, 3.0, 7.0, 4.0];
        assert_eq!(median_of_8(&mut a), 5.0);
    }

    #[test]
    fn min_max_basic() {
        let img = Image::from_shape_vec((2, 2), vec![1.0, -3.0, 9.0, 0.0]).unwrap();
        assert_eq!(min_max(&img), (-3.0, 9.0));
    }

    #[test]
    fn next_power_of_two_basic() {
        assert_eq!(next_power_of_two(1), 1);
        assert_eq!(next_power_of_two(5), 8);
        assert_eq!(next_power_of_two(8), 8);
    }
}
