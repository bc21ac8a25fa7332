use crate::view::ViewportConfig;

// ---------------------------------------------------------------------------
// Frequency sample mask
// ---------------------------------------------------------------------------

/// Return absolute indices of samples that pass the config's frequency filter.
///
/// A sample passes when:
/// * The filter is inactive (see [`ViewportConfig::frequency_filter`]) → every sample passes
/// * `freq_min <= f <= freq_max` → passes (both bounds inclusive)
pub fn masked_indices(frequencies: &[f64], config: &ViewportConfig) -> Vec<usize> {
    match config.frequency_filter() {
        None => (0..frequencies.len()).collect(),
        Some((lo, hi)) => frequencies
            .iter()
            .enumerate()
            .filter(|(_, &f)| lo <= f && f <= hi)
            .map(|(i, _)| i)
            .collect(),
    }
}
