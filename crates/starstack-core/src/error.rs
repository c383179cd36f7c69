use thiserror::Error;

/// Error taxonomy for the stacking pipeline.
///
/// `Io`, `Format`, `ShapeMismatch`, and `Config` abort the run. `SolverDegenerate`
/// and `InsufficientPoints` are caught at the per-frame call site in the
/// driver and only skip that frame.
#[derive(Error, Debug)]
pub enum StarStackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FITS error: {0}")]
    Fits(#[from] fitsio::errors::Error),

    #[error("unsupported FITS format: {0}")]
    Format(String),

    #[error("stacker shape mismatch: accumulator is {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("ICP least-squares matrix is singular or produced NaN")]
    SolverDegenerate,

    #[error("fewer than two stars available (reference has {reference}, source has {source})")]
    InsufficientPoints { reference: usize, source: usize },

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StarStackError>;
