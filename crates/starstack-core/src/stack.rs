//! Online mean/stdev accumulation across accepted frames (spec §4.6).

use crate::error::{Result, StarStackError};
use crate::image::Image;

/// Welford's online accumulator, tracked per-pixel across an arbitrary
/// number of same-shaped frames without holding all of them in memory at once.
pub struct RunningStack {
    count: u64,
    mean: Image,
    m2: Image,
}

impl RunningStack {
    /// An empty accumulator for images of the given shape.
    pub fn new(rows: usize, cols: usize) -> Self {
        RunningStack {
            count: 0,
            mean: Image::zeros((rows, cols)),
            m2: Image::zeros((rows, cols)),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.mean.dim()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Fold one more frame into the accumulator. Every frame after the first
    /// must match the accumulator's shape.
    pub fn push(&mut self, frame: &Image) -> Result<()> {
        if self.count > 0 && frame.dim() != self.mean.dim() {
            return Err(StarStackError::ShapeMismatch {
                expected: self.mean.dim(),
                actual: frame.dim(),
            });
        }
        if self.count == 0 && frame.dim() != self.mean.dim() {
            self.mean = Image::zeros(frame.dim());
            self.m2 = Image::zeros(frame.dim());
        }

        self.count += 1;
        let n = self.count as f64;

        if self.count == 1 {
            self.mean.assign(frame);
            self.m2.fill(0.0);
            return Ok(());
        }

        ndarray::Zip::from(&mut self.mean)
            .and(&mut self.m2)
            .and(frame)
            .for_each(|mean, m2, &value| {
                let delta = value - *mean;
                *mean += delta / n;
                let delta2 = value - *mean;
                *m2 += delta * delta2;
            });

        Ok(())
    }

    /// The per-pixel mean of all frames pushed so far.
    pub fn mean(&self) -> &Image {
        &self.mean
    }

    /// The per-pixel population standard deviation (`sqrt(M2 / n)`) of all
    /// frames pushed so far. All zero before any frame has been pushed.
    pub fn stdev(&self) -> Image {
        if self.count == 0 {
            return self.m2.clone();
        }
        let n = self.count as f64;
        self.m2.mapv(|v| (v / n).sqrt())
    }
}
