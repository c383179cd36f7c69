//! Affine registration by iterative closest point (spec §4.4).
//!
//! `icp_solve(reference, source, guess)` finds the affine transform `G` that
//! best maps `source` points onto `reference` points, i.e. `reference ≈ G · source`.
//! The pipeline driver calls this with the frame's own stars as `reference`
//! and the pipeline's fixed star list as `source`, the mirror image of what
//! the name suggests: that yields a transform that maps pipeline-reference
//! coordinates onto this frame, which is exactly the transform the resampler
//! needs to pull frame pixels back onto the reference grid. See
//! `DESIGN.md` for the worked justification.

use crate::error::{Result, StarStackError};
use crate::stars::Star;

/// A 2x3 affine transform: `[x', y'] = [[a, b, tx], [c, d, ty]] · [x, y, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub tx: f64,
    pub c: f64,
    pub d: f64,
    pub ty: f64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        tx: 0.0,
        c: 0.0,
        d: 1.0,
        ty: 0.0,
    };

    /// Apply the transform to a (row, col) point, treated here as (x, y) = (col, row)
    /// to match the column-major convention the rest of the pipeline uses for points.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.b * y + self.tx, self.c * x + self.d * y + self.ty)
    }

    /// Shear as computed from the off-diagonal/diagonal cross ratio
    /// `(a*c + b*d) / (a*d - b*c)` (spec §4.7); large magnitudes indicate a
    /// degenerate or wildly wrong registration and should be rejected by the caller.
    pub fn shear(&self) -> f64 {
        let denom = self.a * self.d - self.b * self.c;
        (self.a * self.c + self.b * self.d) / denom
    }
}

const MAX_ITERATIONS: usize = crate::consts::ICP_MAX_ITERATIONS;

/// Solve for the affine transform mapping `source` points onto `reference`
/// points, starting from `guess` and refining via greedy closest-pair
/// correspondence. Converges when the match set stops changing between
/// iterations, or returns the last iterate after [`MAX_ITERATIONS`].
pub fn icp_solve(reference: &[(f64, f64)], source: &[(f64, f64)], guess: Affine) -> Result<Affine> {
    if reference.len() < 2 || source.len() < 2 {
        return Err(StarStackError::InsufficientPoints {
            reference: reference.len(),
            source: source.len(),
        });
    }

    // Spec §4.4: only the closest half of the smaller star list is matched
    // per iteration, leaving the weaker, more ambiguous pairings out of the
    // fit entirely rather than trusting them.
    let count = reference.len().min(source.len()) / 2;

    let mut current = guess;
    let mut previous_matches: Option<Vec<(usize, usize)>> = None;

    for _ in 0..MAX_ITERATIONS {
        let transformed: Vec<(f64, f64)> = source.iter().map(|&(x, y)| current.apply(x, y)).collect();
        let matches = closest_pairs(reference, &transformed, count);

        if matches.len() < count {
            return Err(StarStackError::InsufficientPoints {
                reference: reference.len(),
                source: source.len(),
            });
        }

        if let Some(prev) = &previous_matches {
            if prev == &matches {
                return Ok(current);
            }
        }

        current = solve_least_squares(reference, source, &matches)?;
        previous_matches = Some(matches);
    }

    Ok(current)
}

/// Greedily pair the closest `count` reference/transformed-source points,
/// nearest pairs first, so well-matched stars win their pairing before
/// ambiguous ones are resolved. Ties broken by lowest reference index, then
/// lowest source index (spec §4.4).
fn closest_pairs(reference: &[(f64, f64)], transformed: &[(f64, f64)], count: usize) -> Vec<(usize, usize)> {
    let mut candidates: Vec<(f64, usize, usize)> = Vec::with_capacity(reference.len() * transformed.len());
    for (ri, &(rx, ry)) in reference.iter().enumerate() {
        for (si, &(sx, sy)) in transformed.iter().enumerate() {
            let dx = rx - sx;
            let dy = ry - sy;
            candidates.push((dx * dx + dy * dy, ri, si));
        }
    }
    candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let mut used_ref = vec![false; reference.len()];
    let mut used_src = vec![false; transformed.len()];
    let mut matches = Vec::new();
    for (_, ri, si) in candidates {
        if matches.len() == count {
            break;
        }
        if used_ref[ri] || used_src[si] {
            continue;
        }
        used_ref[ri] = true;
        used_src[si] = true;
        matches.push((ri, si));
    }
    matches.sort_unstable();
    matches
}

/// Solve `reference ≈ G · source` in the least-squares sense over the
/// matched point pairs via the normal equations `G' = A·Bᵀ·(B·Bᵀ)⁻¹`, where
/// `A` stacks matched reference points as 2-row columns and `B` stacks
/// matched source points as homogeneous 3-row columns.
fn solve_least_squares(
    reference: &[(f64, f64)],
    source: &[(f64, f64)],
    matches: &[(usize, usize)],
) -> Result<Affine> {
    // B·Bᵀ (3x3) and A·Bᵀ (2x3), accumulated directly without forming A/B.
    let mut btb = [[0.0f64; 3]; 3];
    let mut atb = [[0.0f64; 3]; 2];

    for &(ri, si) in matches {
        let (rx, ry) = reference[ri];
        let (sx, sy) = source[si];
        let b = [sx, sy, 1.0];
        let a = [rx, ry];
        for i in 0..3 {
            for j in 0..3 {
                btb[i][j] += b[i] * b[j];
            }
        }
        for i in 0..2 {
            for j in 0..3 {
                atb[i][j] += a[i] * b[j];
            }
        }
    }

    let inv = invert_3x3(&btb).ok_or(StarStackError::SolverDegenerate)?;

    let mut g = [[0.0f64; 3]; 2];
    for i in 0..2 {
        for j in 0..3 {
            let mut sum = 0.0;
            for k in 0..3 {
                sum += atb[i][k] * inv[k][j];
            }
            g[i][j] = sum;
        }
    }

    if g.iter().flatten().any(|v| v.is_nan() || v.is_infinite()) {
        return Err(StarStackError::SolverDegenerate);
    }

    Ok(Affine {
        a: g[0][0],
        b: g[0][1],
        tx: g[0][2],
        c: g[1][0],
        d: g[1][1],
        ty: g[1][2],
    })
}

/// Closed-form 3x3 matrix inverse via the adjugate. Returns `None` when the
/// determinant is too small to trust (fewer than 3 independent point pairs,
/// or collinear points).
fn invert_3x3(m: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);

    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;

    let mut adj = [[0.0f64; 3]; 3];
    adj[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
    adj[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
    adj[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
    adj[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
    adj[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
    adj[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;
    adj[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
    adj[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
    adj[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;

    Some(adj)
}

/// Convenience constructor so callers don't need to import [`Star`] directly
/// to build point lists for [`icp_solve`].
pub fn stars_to_points(stars: &[Star]) -> Vec<(f64, f64)> {
    stars.iter().map(|s| (s.col, s.row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Six well-separated, non-collinear points: enough that `count = n/2 = 3`
    /// (spec §4.4) still leaves a full-rank affine fit.
    fn scattered_points() -> Vec<(f64, f64)> {
        vec![
            (10.0, 10.0),
            (60.0, 20.0),
            (30.0, 70.0),
            (80.0, 15.0),
            (15.0, 85.0),
            (95.0, 45.0),
        ]
    }

    #[test]
    fn identity_guess_on_identical_points_converges_to_identity() {
        let points = scattered_points();
        let result = icp_solve(&points, &points, Affine::IDENTITY).unwrap();
        assert!((result.a - 1.0).abs() < 1e-6);
        assert!((result.d - 1.0).abs() < 1e-6);
        assert!(result.tx.abs() < 1e-6);
        assert!(result.ty.abs() < 1e-6);
    }

    #[test]
    fn pure_translation_is_recovered() {
        let reference = scattered_points();
        let source: Vec<(f64, f64)> = reference.iter().map(|&(x, y)| (x + 5.0, y)).collect();
        let result = icp_solve(&reference, &source, Affine::IDENTITY).unwrap();
        assert!((result.tx - (-5.0)).abs() < 1e-6);
        assert!(result.ty.abs() < 1e-6);
    }

    #[test]
    fn too_few_points_is_an_error() {
        let points = vec![(1.0, 1.0)];
        let err = icp_solve(&points, &points, Affine::IDENTITY).unwrap_err();
        assert!(matches!(err, StarStackError::InsufficientPoints { .. }));
    }

    #[test]
    fn shear_of_identity_is_zero() {
        assert!(Affine::IDENTITY.shear().abs() < 1e-12);
    }
}
