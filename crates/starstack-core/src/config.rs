//! Pipeline configuration (spec §6).
//!
//! A plain value struct threaded explicitly through the driver and its
//! components; there is no global or lazily-initialized config state, and
//! nothing here is persisted between runs, so it carries no (de)serialization.

use std::path::PathBuf;

use crate::consts::{
    DEFAULT_FREQ_REMOVAL_WAVELET, DEFAULT_SHEAR_THRESHOLD, DEFAULT_STAR_THRESHOLD_PERCENT,
};
use crate::flatten::FlattenStrategy;

/// Knobs for one run of the stacking pipeline, populated directly from CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Skip star detection and ICP registration entirely; frames are summed
    /// into the stack at their native alignment (spec §6 `--noreg`).
    pub noreg: bool,
    /// Output sampling density relative to the reference frame; 1.0 keeps
    /// the reference's native resolution.
    pub subsample: f64,
    /// Frames whose ICP solution has `|shear()|` above this are rejected.
    pub shear_threshold: f64,
    /// Percentile kept by [`crate::flatten::threshold_percentile`] ahead of
    /// star detection.
    pub star_threshold_percent: f64,
    /// Strategy-specific low-frequency suppression depth, forwarded to
    /// [`crate::flatten::suppress_low_frequency`].
    pub freq_removal: u32,
    pub flatten_strategy: FlattenStrategy,
    /// When set, diagnostic intermediates are written under this directory.
    pub dump_dir: Option<PathBuf>,
    pub dump_flat: bool,
    pub dump_stars: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            noreg: false,
            subsample: 1.0,
            shear_threshold: DEFAULT_SHEAR_THRESHOLD,
            star_threshold_percent: DEFAULT_STAR_THRESHOLD_PERCENT,
            freq_removal: DEFAULT_FREQ_REMOVAL_WAVELET,
            flatten_strategy: FlattenStrategy::Wavelet,
            dump_dir: None,
            dump_flat: false,
            dump_stars: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let config = PipelineConfig::default();
        assert!(!config.noreg);
        assert_eq!(config.subsample, 1.0);
        assert_eq!(config.flatten_strategy, FlattenStrategy::Wavelet);
    }
}
