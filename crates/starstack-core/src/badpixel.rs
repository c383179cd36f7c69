//! Single-pixel outlier repair (spec §4.1).

use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::image::{min_max, Image};

/// Replace isolated outlier pixels with the median of their 8 neighbours.
///
/// Reads the pre-pass image throughout: a replacement never influences
/// another pixel's decision within the same pass. Border pixels are
/// untouched. Returns the repaired image and the count of pixels replaced.
pub fn remove_bad_pixels(image: &Image) -> (Image, usize) {
    let (rows, cols) = image.dim();
    let mut output = image.clone();
    if rows < 3 || cols < 3 {
        return (output, 0);
    }

    let (min, max) = min_max(image);
    let tolerance = (max - min) / 10.0;

    if rows * cols >= PARALLEL_PIXEL_THRESHOLD {
        let replaced_rows: Vec<(usize, Vec<(usize, f64)>)> = (1..rows - 1)
            .into_par_iter()
            .map(|row| (row, repair_row(image, row, cols, tolerance)))
            .collect();
        let mut count = 0;
        for (row, replacements) in replaced_rows {
            for (col, value) in replacements {
                output[[row, col]] = value;
                count += 1;
            }
        }
        (output, count)
    } else {
        let mut count = 0;
        for row in 1..rows - 1 {
            for (col, value) in repair_row(image, row, cols, tolerance) {
                output[[row, col]] = value;
                count += 1;
            }
        }
        (output, count)
    }
}

/// Inspect a single interior row against the pre-pass `image`, returning the
/// `(col, replacement)` pairs that exceed the outlier tolerance.
fn repair_row(image: &Image, row: usize, cols: usize, tolerance: f64) -> Vec<(usize, f64)> {
    let mut replacements = Vec::new();
    for col in 1..cols - 1 {
        let mut neighbours = [
            image[[row - 1, col - 1]],
            image[[row - 1, col]],
            image[[row - 1, col + 1]],
            image[[row, col - 1]],
            image[[row, col + 1]],
            image[[row + 1, col - 1]],
            image[[row + 1, col]],
            image[[row + 1, col + 1]],
        ];
        let median = crate::image::median_of_8(&mut neighbours);
        let value = image[[row, col]];
        if (value - median).abs() > tolerance {
            replacements.push((col, median));
        }
    }
    replacements
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn clean_image_is_unchanged() {
        let image = Array2::from_shape_fn((10, 10), |(r, c)| (r * 10 + c) as f64 * 0.1);
        let (output, count) = remove_bad_pixels(&image);
        assert_eq!(count, 0);
        assert_eq!(output, image);
    }

    #[test]
    fn single_hot_pixel_is_replaced() {
        let mut image = Array2::from_elem((10, 10), 10.0);
        image[[5, 5]] = 1e6;
        let (output, count) = remove_bad_pixels(&image);
        assert_eq!(count, 1);
        assert!((output[[5, 5]] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn border_pixels_are_never_touched() {
        let mut image = Array2::from_elem((10, 10), 10.0);
        image[[0, 0]] = 1e6;
        image[[0, 9]] = 1e6;
        image[[9, 9]] = 1e6;
        let (output, count) = remove_bad_pixels(&image);
        assert_eq!(count, 0);
        assert_eq!(output[[0, 0]], 1e6);
    }

    #[test]
    fn small_images_are_left_alone() {
        let image = Array2::from_elem((2, 2), 5.0);
        let (output, count) = remove_bad_pixels(&image);
        assert_eq!(count, 0);
        assert_eq!(output, image);
    }
}
