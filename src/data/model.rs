use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use num_complex::Complex64;

use super::error::InvalidParameterError;
use crate::view::Projection;

/// Floor applied to |S| before taking the logarithm, so an exact zero maps to
/// -240 dB instead of -inf.
pub const MAGNITUDE_FLOOR: f64 = 1e-12;

/// Parameter names are `S<row><col>` with single-digit indices.
pub const MAX_PORTS: usize = 9;

// ---------------------------------------------------------------------------
// Scalar conversions shared by every derived view
// ---------------------------------------------------------------------------

/// `20·log10(max(|z|, 1e-12))`.
pub fn magnitude_db(z: Complex64) -> f64 {
    20.0 * z.norm().max(MAGNITUDE_FLOOR).log10()
}

/// Phase in degrees, in `(-180, 180]`.
pub fn phase_deg(z: Complex64) -> f64 {
    let deg = z.im.atan2(z.re).to_degrees();
    // atan2 returns -pi for a negative-zero imaginary part on the negative real axis
    if deg == -180.0 { 180.0 } else { deg }
}

// ---------------------------------------------------------------------------
// NetworkMeasurement – decoded frequency samples + S-matrices
// ---------------------------------------------------------------------------

/// The narrow in-memory contract between the file parser and the dataset:
/// N frequency samples (Hz) and N matrices of P×P complex S-parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkMeasurement {
    frequencies: Vec<f64>,
    port_count: usize,
    /// Row-major `[sample][row][col]`, length N·P·P.
    s: Vec<Complex64>,
}

impl NetworkMeasurement {
    /// Validate and wrap decoded parser output.
    pub fn new(frequencies: Vec<f64>, port_count: usize, s: Vec<Complex64>) -> Result<Self> {
        let n = frequencies.len();
        let expected = n * port_count * port_count;
        if s.len() != expected {
            bail!(
                "S-matrix holds {} values, expected {n} samples × {port_count}² = {expected}",
                s.len()
            );
        }
        if port_count > 0 && n == 0 {
            bail!("Network has no frequency samples");
        }
        if let Some(k) = frequencies.iter().position(|f| !f.is_finite()) {
            bail!("Frequency sample {k} is not finite");
        }
        if let Some(k) = frequencies.windows(2).position(|w| w[1] < w[0]) {
            bail!(
                "Frequencies must be non-decreasing: sample {} ({}) follows {}",
                k + 1,
                frequencies[k + 1],
                frequencies[k]
            );
        }
        Ok(Self {
            frequencies,
            port_count,
            s,
        })
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn port_count(&self) -> usize {
        self.port_count
    }

    pub fn sample_count(&self) -> usize {
        self.frequencies.len()
    }

    /// `S[row][col]` at frequency sample `k`.
    pub fn s(&self, k: usize, row: usize, col: usize) -> Complex64 {
        let p = self.port_count;
        self.s[k * p * p + row * p + col]
    }
}

// ---------------------------------------------------------------------------
// SampleInfo – everything known about one (trace, frequency) sample
// ---------------------------------------------------------------------------

/// Result of [`SParameterDataset::nearest_sample`]; feeds both hover tooltips
/// and persistent markers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleInfo {
    pub index: usize,
    pub frequency: f64,
    pub magnitude_db: f64,
    pub phase_deg: f64,
    pub complex: Complex64,
}

impl SampleInfo {
    /// Plot-space coordinates of this sample under `projection`.
    pub fn position(&self, projection: Projection) -> [f64; 2] {
        match projection {
            Projection::MagnitudeDb => [self.frequency, self.magnitude_db],
            Projection::PhaseDeg => [self.frequency, self.phase_deg],
            Projection::Smith => [self.complex.re, self.complex.im],
        }
    }

    /// Multi-line annotation text; the Smith view also shows the raw complex value.
    pub fn tooltip_text(&self, trace: &str, projection: Projection) -> String {
        let mut text = format!(
            "{trace}\nFreq: {:.3} GHz\nMag: {:.2} dB\nPhase: {:.2}°",
            self.frequency / 1e9,
            self.magnitude_db,
            self.phase_deg
        );
        if projection == Projection::Smith {
            let sign = if self.complex.im < 0.0 { '-' } else { '+' };
            text.push_str(&format!(
                "\nZ: {:.3}{sign}{:.3}j",
                self.complex.re,
                self.complex.im.abs()
            ));
        }
        text
    }
}

// ---------------------------------------------------------------------------
// SParameterDataset – a loaded file plus its derived views
// ---------------------------------------------------------------------------

/// A loaded network with file metadata and pre-computed parameter names.
#[derive(Debug, Clone)]
pub struct SParameterDataset {
    pub filename: String,
    pub filepath: PathBuf,
    network: NetworkMeasurement,
    parameter_names: Vec<String>,
}

impl SParameterDataset {
    pub fn new(network: NetworkMeasurement, filename: &str, filepath: &Path) -> Self {
        let p = network.port_count();
        let parameter_names = (1..=p)
            .flat_map(|i| (1..=p).map(move |j| format!("S{i}{j}")))
            .collect();
        Self {
            filename: filename.to_string(),
            filepath: filepath.to_path_buf(),
            network,
            parameter_names,
        }
    }

    pub fn frequencies(&self) -> &[f64] {
        self.network.frequencies()
    }

    pub fn port_count(&self) -> usize {
        self.network.port_count()
    }

    pub fn sample_count(&self) -> usize {
        self.network.sample_count()
    }

    /// First and last frequency sample (Hz).
    pub fn frequency_span(&self) -> (f64, f64) {
        let f = self.frequencies();
        match (f.first(), f.last()) {
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ => (0.0, 0.0),
        }
    }

    /// All `S{i}{j}` names in row-major order: S11, S12, …, S1P, S21, …, SPP.
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    /// Parse `"S{i}{j}"` into zero-based `(row, col)`.
    ///
    /// Only the exact three-character form with single-digit ports is accepted.
    pub fn resolve_indices(&self, name: &str) -> Result<(usize, usize), InvalidParameterError> {
        let bytes = name.as_bytes();
        if bytes.len() != 3 || bytes[0] != b'S' {
            return Err(InvalidParameterError::new(name, "expected the form S<i><j>"));
        }
        let port = |b: u8| -> Result<usize, InvalidParameterError> {
            if !b.is_ascii_digit() {
                return Err(InvalidParameterError::new(name, "port indices must be digits"));
            }
            let idx = (b - b'0') as usize;
            if idx == 0 || idx > self.port_count() {
                return Err(InvalidParameterError::new(
                    name,
                    format!("port index out of range 1..={}", self.port_count()),
                ));
            }
            Ok(idx - 1)
        };
        Ok((port(bytes[1])?, port(bytes[2])?))
    }

    /// Full, unfiltered complex series for one parameter.
    pub fn complex_series(&self, name: &str) -> Result<(&[f64], Vec<Complex64>), InvalidParameterError> {
        let (row, col) = self.resolve_indices(name)?;
        let values = (0..self.sample_count())
            .map(|k| self.network.s(k, row, col))
            .collect();
        Ok((self.frequencies(), values))
    }

    pub fn magnitude_db_series(&self, name: &str) -> Result<(&[f64], Vec<f64>), InvalidParameterError> {
        let (freqs, values) = self.complex_series(name)?;
        Ok((freqs, values.into_iter().map(magnitude_db).collect()))
    }

    pub fn phase_deg_series(&self, name: &str) -> Result<(&[f64], Vec<f64>), InvalidParameterError> {
        let (freqs, values) = self.complex_series(name)?;
        Ok((freqs, values.into_iter().map(phase_deg).collect()))
    }

    /// Index of the sample closest to `target_hz`; the first one wins on ties.
    pub fn nearest_index(&self, target_hz: f64) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (k, &f) in self.frequencies().iter().enumerate() {
            let dist = (f - target_hz).abs();
            if dist < best_dist {
                best = k;
                best_dist = dist;
            }
        }
        best
    }

    /// All derived values at the sample nearest to `target_hz`.
    pub fn nearest_sample(&self, name: &str, target_hz: f64) -> Result<SampleInfo, InvalidParameterError> {
        let (row, col) = self.resolve_indices(name)?;
        Ok(self.sample_at(self.nearest_index(target_hz), row, col))
    }

    fn sample_at(&self, index: usize, row: usize, col: usize) -> SampleInfo {
        let z = self.network.s(index, row, col);
        SampleInfo {
            index,
            frequency: self.frequencies()[index],
            magnitude_db: magnitude_db(z),
            phase_deg: phase_deg(z),
            complex: z,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Three samples at 1/2/3 GHz:
    /// S11 = 1, S12 = 0.5-0.5j, S21 = 0.5+0.5j, S22 = 0.1.
    pub(crate) fn two_port_dataset() -> SParameterDataset {
        let freqs = vec![1e9, 2e9, 3e9];
        let matrix = [
            Complex64::new(1.0, 0.0),
            Complex64::new(0.5, -0.5),
            Complex64::new(0.5, 0.5),
            Complex64::new(0.1, 0.0),
        ];
        let s = (0..freqs.len()).flat_map(|_| matrix).collect();
        let network = NetworkMeasurement::new(freqs, 2, s).unwrap();
        SParameterDataset::new(network, "test.s2p", Path::new("/path/to/test.s2p"))
    }

    fn one_port(freqs: Vec<f64>, s: Vec<Complex64>) -> SParameterDataset {
        let network = NetworkMeasurement::new(freqs, 1, s).unwrap();
        SParameterDataset::new(network, "one.s1p", Path::new("one.s1p"))
    }

    fn blank(ports: usize) -> SParameterDataset {
        let s = vec![Complex64::new(0.0, 0.0); ports * ports];
        let network = NetworkMeasurement::new(vec![1e9], ports, s).unwrap();
        SParameterDataset::new(network, "blank", Path::new("blank"))
    }

    #[test]
    fn dataset_initialization() {
        let ds = two_port_dataset();
        assert_eq!(ds.filename, "test.s2p");
        assert_eq!(ds.filepath, PathBuf::from("/path/to/test.s2p"));
        assert_eq!(ds.port_count(), 2);
        assert_eq!(ds.frequencies(), &[1e9, 2e9, 3e9]);
        assert_eq!(ds.frequency_span(), (1e9, 3e9));
    }

    #[test]
    fn parameter_names_are_row_major() {
        assert_eq!(blank(1).parameter_names(), &["S11"]);
        assert_eq!(blank(2).parameter_names(), &["S11", "S12", "S21", "S22"]);
        assert_eq!(
            blank(3).parameter_names(),
            &["S11", "S12", "S13", "S21", "S22", "S23", "S31", "S32", "S33"]
        );
        let four = blank(4);
        assert_eq!(four.parameter_names().len(), 16);
        assert_eq!(four.parameter_names()[4], "S21");
        assert_eq!(four.parameter_names()[15], "S44");
    }

    #[test]
    fn resolve_indices_accepts_valid_tokens() {
        let ds = two_port_dataset();
        assert_eq!(ds.resolve_indices("S21"), Ok((1, 0)));
        assert_eq!(ds.resolve_indices("S12"), Ok((0, 1)));
        assert_eq!(ds.resolve_indices("S22"), Ok((1, 1)));
    }

    #[test]
    fn resolve_indices_rejects_bad_tokens() {
        let ds = two_port_dataset();
        for bad in ["S99", "S31", "S10", "S00", "s21", "S2", "S211", "X21", "S2a", "", "S２1"] {
            let err = ds.resolve_indices(bad).unwrap_err();
            assert_eq!(err.name, bad);
        }
    }

    #[test]
    fn complex_series_is_full_length() {
        let ds = two_port_dataset();
        let (freqs, values) = ds.complex_series("S21").unwrap();
        assert_eq!(freqs.len(), 3);
        assert_eq!(values, vec![Complex64::new(0.5, 0.5); 3]);
    }

    #[test]
    fn magnitude_db_values() {
        let ds = two_port_dataset();
        let (_, mag) = ds.magnitude_db_series("S11").unwrap();
        assert_eq!(mag, vec![0.0; 3]);

        let (_, mag) = ds.magnitude_db_series("S21").unwrap();
        let expected = 20.0 * Complex64::new(0.5, 0.5).norm().log10();
        assert!((mag[0] - expected).abs() < 1e-12);
        assert!((mag[0] + 3.0103).abs() < 1e-4);
    }

    #[test]
    fn magnitude_of_zero_is_clamped() {
        let ds = one_port(vec![1e9], vec![Complex64::new(0.0, 0.0)]);
        let (_, mag) = ds.magnitude_db_series("S11").unwrap();
        assert_eq!(mag[0], -240.0);
        assert_eq!(ds.nearest_sample("S11", 1e9).unwrap().magnitude_db, -240.0);
    }

    #[test]
    fn phase_values() {
        let ds = two_port_dataset();
        let (_, phase) = ds.phase_deg_series("S11").unwrap();
        assert_eq!(phase[0], 0.0);
        let (_, phase) = ds.phase_deg_series("S21").unwrap();
        assert_eq!(phase[0], 45.0);
        let (_, phase) = ds.phase_deg_series("S12").unwrap();
        assert_eq!(phase[0], -45.0);
    }

    #[test]
    fn phase_on_negative_real_axis_is_plus_180() {
        assert_eq!(phase_deg(Complex64::new(-1.0, 0.0)), 180.0);
        assert_eq!(phase_deg(Complex64::new(-1.0, -0.0)), 180.0);
    }

    #[test]
    fn invalid_parameter_propagates_from_accessors() {
        let ds = two_port_dataset();
        assert!(ds.magnitude_db_series("S99").is_err());
        assert!(ds.phase_deg_series("S99").is_err());
        assert!(ds.complex_series("S99").is_err());
        assert!(ds.nearest_sample("S99", 1e9).is_err());
    }

    #[test]
    fn nearest_sample_exact_hits() {
        let ds = two_port_dataset();
        for name in ds.parameter_names() {
            for &f in ds.frequencies() {
                assert_eq!(ds.nearest_sample(name, f).unwrap().frequency, f);
            }
        }
    }

    #[test]
    fn nearest_sample_between_and_outside() {
        let ds = two_port_dataset();
        let info = ds.nearest_sample("S21", 2.2e9).unwrap();
        assert_eq!(info.index, 1);
        assert_eq!(info.frequency, 2e9);
        assert_eq!(info.complex, Complex64::new(0.5, 0.5));
        assert_eq!(info.phase_deg, 45.0);

        assert_eq!(ds.nearest_sample("S21", -5.0).unwrap().index, 0);
        assert_eq!(ds.nearest_sample("S21", 1e12).unwrap().index, 2);
    }

    #[test]
    fn nearest_sample_tie_prefers_first() {
        let ds = two_port_dataset();
        assert_eq!(ds.nearest_sample("S11", 1.5e9).unwrap().index, 0);

        let dup = one_port(
            vec![1.0, 2.0, 2.0],
            vec![Complex64::new(0.1, 0.0), Complex64::new(0.2, 0.0), Complex64::new(0.3, 0.0)],
        );
        assert_eq!(dup.nearest_sample("S11", 2.0).unwrap().index, 1);
    }

    #[test]
    fn measurement_validation() {
        let one = vec![Complex64::new(0.0, 0.0)];
        assert!(NetworkMeasurement::new(vec![1.0, 2.0], 1, one.clone()).is_err());
        assert!(NetworkMeasurement::new(vec![], 1, vec![]).is_err());
        assert!(NetworkMeasurement::new(vec![2.0, 1.0], 1, vec![one[0]; 2]).is_err());
        assert!(NetworkMeasurement::new(vec![f64::NAN], 1, one.clone()).is_err());
        assert!(NetworkMeasurement::new(vec![1.0, 1.0], 1, vec![one[0]; 2]).is_ok());
        assert_eq!(NetworkMeasurement::new(vec![1.0], 0, vec![]).unwrap().port_count(), 0);
    }

    #[test]
    fn tooltip_text_matches_projection() {
        let ds = two_port_dataset();
        let info = ds.nearest_sample("S21", 2e9).unwrap();
        let mag = info.tooltip_text("S21", Projection::MagnitudeDb);
        assert_eq!(mag, "S21\nFreq: 2.000 GHz\nMag: -3.01 dB\nPhase: 45.00°");
        let smith = info.tooltip_text("S21", Projection::Smith);
        assert!(smith.ends_with("\nZ: 0.500+0.500j"));

        let s12 = ds.nearest_sample("S12", 2e9).unwrap();
        assert!(s12.tooltip_text("S12", Projection::Smith).ends_with("Z: 0.500-0.500j"));
    }

    #[test]
    fn position_is_projection_aware() {
        let ds = two_port_dataset();
        let info = ds.nearest_sample("S21", 2e9).unwrap();
        assert_eq!(info.position(Projection::MagnitudeDb)[0], 2e9);
        assert_eq!(info.position(Projection::PhaseDeg), [2e9, 45.0]);
        assert_eq!(info.position(Projection::Smith), [0.5, 0.5]);
    }
}
