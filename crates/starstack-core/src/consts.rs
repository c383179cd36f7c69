/// Minimum pixel count (rows*cols) before row-level Rayon parallelism is used.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Star candidates with fewer visited pixels than this are rejected as noise.
pub const MIN_STAR_PIXELS: usize = 25;

/// Star candidates with more visited pixels than this are rejected as
/// saturated/blooming clusters; flood fill also exits early at this count.
pub const MAX_STAR_PIXELS: usize = 2048;

/// Daubechies-4 filter taps `h = [(1+√3)/4, (3+√3)/4, (3−√3)/4, (1−√3)/4]`.
/// Written as literals since `sqrt` isn't usable in a const context on our MSRV.
pub const DAUBECHIES4_TAPS: [f64; 4] = [
    0.683_012_701_892_219_3,
    1.183_012_701_892_219_3,
    0.316_987_298_107_780_68,
    -0.183_012_701_892_219_3,
];

/// Default ICP iteration ceiling (spec §4.4 / §9: "a pragmatic value is 32").
pub const ICP_MAX_ITERATIONS: usize = 32;

/// Default shear rejection threshold (spec §4.7).
pub const DEFAULT_SHEAR_THRESHOLD: f64 = 0.001;

/// Default star-detection flatten percentile (spec §6).
pub const DEFAULT_STAR_THRESHOLD_PERCENT: f64 = 1.0;

/// Default low-frequency suppression parameter for the wavelet flattener.
pub const DEFAULT_FREQ_REMOVAL_WAVELET: u32 = 4;

/// Default low-frequency suppression parameter for the FFT flattener
/// (spec §9 notes the default differs by spectral strategy).
pub const DEFAULT_FREQ_REMOVAL_FFT: u32 = 10;
