use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use num_complex::Complex64;

use super::model::{MAX_PORTS, NetworkMeasurement};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Parse a Touchstone v1/v2 file into a [`NetworkMeasurement`].
///
/// The port count comes from the `.sNp` extension for version 1 files and
/// from `[Number of Ports]` for version 2 (the keyword wins when both exist).
pub fn parse_file(path: &Path) -> Result<NetworkMeasurement> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_str(&text, ports_from_extension(path))
}

/// `foo.s2p` → 2. `.snp`, `.ts` and anything else → `None`.
pub fn ports_from_extension(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    ext.strip_prefix('s')?.strip_suffix('p')?.parse().ok()
}

/// Parse Touchstone text. `ports_hint` is used unless the text declares
/// `[Number of Ports]` itself.
pub fn parse_str(text: &str, ports_hint: Option<usize>) -> Result<NetworkMeasurement> {
    let mut parser = Parser::new(ports_hint);
    for (line_no, raw) in text.lines().enumerate() {
        let done = parser
            .feed_line(raw)
            .with_context(|| format!("line {}", line_no + 1))?;
        if done {
            break;
        }
    }
    parser.finish()
}

// ---------------------------------------------------------------------------
// Option line: `# <unit> <parameter> <format> R <z0>`
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum DataFormat {
    DbAngle,
    MagAngle,
    RealImag,
}

impl DataFormat {
    fn to_complex(self, a: f64, b: f64) -> Complex64 {
        match self {
            DataFormat::RealImag => Complex64::new(a, b),
            DataFormat::MagAngle => Complex64::from_polar(a, b.to_radians()),
            DataFormat::DbAngle => Complex64::from_polar(10f64.powf(a / 20.0), b.to_radians()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Options {
    /// Multiplier converting file frequency units to Hz.
    unit: f64,
    format: DataFormat,
    resistance: f64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            unit: 1e9,
            format: DataFormat::MagAngle,
            resistance: 50.0,
        }
    }
}

fn parse_option_line(line: &str) -> Result<Options> {
    let mut options = Options::default();
    let lower = line.to_ascii_lowercase();
    let mut tokens = lower.split_whitespace().skip(1);
    while let Some(tok) = tokens.next() {
        match tok {
            "hz" => options.unit = 1.0,
            "khz" => options.unit = 1e3,
            "mhz" => options.unit = 1e6,
            "ghz" => options.unit = 1e9,
            "s" => {}
            "y" | "z" | "g" | "h" => bail!(
                "{}-parameter data is not supported, only S-parameters can be viewed",
                tok.to_ascii_uppercase()
            ),
            "db" => options.format = DataFormat::DbAngle,
            "ma" => options.format = DataFormat::MagAngle,
            "ri" => options.format = DataFormat::RealImag,
            "r" => {
                let value = tokens.next().context("option 'R' without a resistance")?;
                options.resistance = value
                    .parse()
                    .with_context(|| format!("reference resistance '{value}' is not a number"))?;
            }
            other => bail!("unknown option '{other}'"),
        }
    }
    Ok(options)
}

// ---------------------------------------------------------------------------
// Line-oriented parser state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum MatrixFormat {
    Full,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Header,
    Information,
    NetworkData,
    NoiseData,
}

struct Parser {
    version_two: bool,
    ports: Option<usize>,
    options: Option<Options>,
    /// 2-port column order: `true` for S11 S21 S12 S22 (the version 1 layout).
    order_21_12: bool,
    matrix_format: MatrixFormat,
    declared_frequencies: Option<usize>,
    section: Section,
    /// `[Reference]` values still expected on following lines.
    reference_remaining: usize,
    pending: Vec<f64>,
    frequencies: Vec<f64>,
    records: Vec<Vec<f64>>,
}

impl Parser {
    fn new(ports_hint: Option<usize>) -> Self {
        Parser {
            version_two: false,
            ports: ports_hint,
            options: None,
            order_21_12: true,
            matrix_format: MatrixFormat::Full,
            declared_frequencies: None,
            section: Section::Header,
            reference_remaining: 0,
            pending: Vec::new(),
            frequencies: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Returns `true` once `[End]` has been reached.
    fn feed_line(&mut self, raw: &str) -> Result<bool> {
        let line = match raw.find('!') {
            Some(idx) => &raw[..idx],
            None => raw,
        }
        .trim();
        if line.is_empty() {
            return Ok(false);
        }

        if line.starts_with('[') {
            return self.keyword(line);
        }
        if self.section == Section::Information {
            return Ok(false);
        }
        if line.starts_with('#') {
            // only the first option line counts
            if self.options.is_none() {
                self.options = Some(parse_option_line(line)?);
            }
            return Ok(false);
        }

        let values = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>()
                    .map_err(|_| anyhow!("'{tok}' is not a number"))
            })
            .collect::<Result<Vec<f64>>>()?;

        if self.reference_remaining > 0 {
            self.reference_remaining = self.reference_remaining.saturating_sub(values.len());
            return Ok(false);
        }
        if self.section == Section::NoiseData {
            return Ok(false);
        }
        self.data_line(values)?;
        Ok(false)
    }

    fn keyword(&mut self, line: &str) -> Result<bool> {
        let close = line.find(']').context("unterminated keyword")?;
        let keyword = line[1..close].trim().to_ascii_lowercase();
        let rest = line[close + 1..].trim();

        if self.section == Section::Information && keyword != "end information" {
            return Ok(false);
        }

        match keyword.as_str() {
            "version" => self.version_two = rest.starts_with('2'),
            "number of ports" => {
                let ports: usize = rest
                    .parse()
                    .with_context(|| format!("invalid port count '{rest}'"))?;
                if ports > MAX_PORTS {
                    bail!("{ports} ports is more than the supported {MAX_PORTS}");
                }
                self.ports = Some(ports);
            }
            "two-port data order" => {
                self.order_21_12 = match rest {
                    "21_12" => true,
                    "12_21" => false,
                    other => bail!("invalid two-port data order '{other}'"),
                }
            }
            "number of frequencies" => {
                let n = rest
                    .parse()
                    .with_context(|| format!("invalid frequency count '{rest}'"))?;
                self.declared_frequencies = Some(n);
            }
            "reference" => {
                let given = rest.split_whitespace().count();
                self.reference_remaining = self.ports.unwrap_or(given).saturating_sub(given);
            }
            "matrix format" => {
                self.matrix_format = match rest.to_ascii_lowercase().as_str() {
                    "full" => MatrixFormat::Full,
                    "lower" => MatrixFormat::Lower,
                    "upper" => MatrixFormat::Upper,
                    other => bail!("invalid matrix format '{other}'"),
                }
            }
            "mixed-mode order" => bail!("mixed-mode data is not supported"),
            "network data" => self.section = Section::NetworkData,
            "noise data" => self.section = Section::NoiseData,
            "begin information" => self.section = Section::Information,
            "end information" => self.section = Section::Header,
            "end" => return Ok(true),
            other => log::debug!("Ignoring Touchstone keyword [{other}]"),
        }
        Ok(false)
    }

    /// Number of complex values stored per frequency record.
    fn pairs_per_record(&self, ports: usize) -> usize {
        match self.matrix_format {
            MatrixFormat::Full => ports * ports,
            MatrixFormat::Lower | MatrixFormat::Upper => ports * (ports + 1) / 2,
        }
    }

    fn data_line(&mut self, values: Vec<f64>) -> Result<()> {
        let ports = self.ports.context(
            "port count unknown: use a .sNp extension or declare [Number of Ports]",
        )?;
        if ports > MAX_PORTS {
            bail!("{ports} ports is more than the supported {MAX_PORTS}");
        }
        if self.options.is_none() {
            self.options = Some(Options::default());
        }

        // 2-port v1 files append noise parameters after the network data; the
        // first noise record has a frequency at or below the last network one.
        if self.pending.is_empty() && !self.version_two && ports == 2 {
            if let (Some(&first), Some(&last)) = (values.first(), self.frequencies.last()) {
                if first <= last {
                    log::debug!("Skipping noise data starting at {first}");
                    self.section = Section::NoiseData;
                    return Ok(());
                }
            }
        }

        let record_len = 1 + 2 * self.pairs_per_record(ports);
        self.pending.extend(values);
        while self.pending.len() >= record_len {
            let rest = self.pending.split_off(record_len);
            let record = std::mem::replace(&mut self.pending, rest);
            self.frequencies.push(record[0]);
            self.records.push(record[1..].to_vec());
        }
        Ok(())
    }

    fn finish(self) -> Result<NetworkMeasurement> {
        let ports = self.ports.context("port count unknown")?;
        if !self.pending.is_empty() {
            bail!(
                "truncated data record: {} trailing value(s) after {} complete sample(s)",
                self.pending.len(),
                self.frequencies.len()
            );
        }
        if self.frequencies.is_empty() {
            bail!("no network data found");
        }
        if let Some(n) = self.declared_frequencies {
            if n != self.frequencies.len() {
                bail!(
                    "[Number of Frequencies] is {n} but {} samples were read",
                    self.frequencies.len()
                );
            }
        }

        let options = self.options.unwrap_or_default();
        log::debug!(
            "Touchstone: {ports} port(s), {} samples, {:?}, R = {}",
            self.frequencies.len(),
            options.format,
            options.resistance
        );

        let mut s = Vec::with_capacity(self.records.len() * ports * ports);
        for record in &self.records {
            let pairs: Vec<Complex64> = record
                .chunks_exact(2)
                .map(|p| options.format.to_complex(p[0], p[1]))
                .collect();
            s.extend(self.arrange(ports, &pairs));
        }
        let frequencies = self.frequencies.iter().map(|f| f * options.unit).collect();
        NetworkMeasurement::new(frequencies, ports, s)
    }

    /// Lay out one record's values as a row-major P×P matrix.
    fn arrange(&self, ports: usize, pairs: &[Complex64]) -> Vec<Complex64> {
        let mut matrix = vec![Complex64::new(0.0, 0.0); ports * ports];
        match self.matrix_format {
            MatrixFormat::Full => {
                for (k, &z) in pairs.iter().enumerate() {
                    let (row, col) = if ports == 2 && self.order_21_12 {
                        (k % 2, k / 2)
                    } else {
                        (k / ports, k % ports)
                    };
                    matrix[row * ports + col] = z;
                }
            }
            MatrixFormat::Lower | MatrixFormat::Upper => {
                let cells = (0..ports).flat_map(|row| {
                    let cols = match self.matrix_format {
                        MatrixFormat::Lower => 0..row + 1,
                        _ => row..ports,
                    };
                    cols.map(move |col| (row, col))
                });
                for ((row, col), &z) in cells.zip(pairs) {
                    matrix[row * ports + col] = z;
                    matrix[col * ports + row] = z;
                }
            }
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-9
    }

    #[test]
    fn extension_port_count() {
        assert_eq!(ports_from_extension(Path::new("a/b/filter.s2p")), Some(2));
        assert_eq!(ports_from_extension(Path::new("X.S4P")), Some(4));
        assert_eq!(ports_from_extension(Path::new("x.snp")), None);
        assert_eq!(ports_from_extension(Path::new("x.ts")), None);
        assert_eq!(ports_from_extension(Path::new("noext")), None);
    }

    #[test]
    fn one_port_ri_hz() {
        let text = "! comment\n# Hz S RI R 50\n1 0.5 0.5\n2 0 -1 ! trailing\n";
        let net = parse_str(text, Some(1)).unwrap();
        assert_eq!(net.port_count(), 1);
        assert_eq!(net.frequencies(), &[1.0, 2.0]);
        assert_eq!(net.s(0, 0, 0), Complex64::new(0.5, 0.5));
        assert_eq!(net.s(1, 0, 0), Complex64::new(0.0, -1.0));
    }

    #[test]
    fn defaults_are_ghz_magnitude_angle() {
        let net = parse_str("1 2 90\n", Some(1)).unwrap();
        assert_eq!(net.frequencies(), &[1e9]);
        assert!(close(net.s(0, 0, 0), Complex64::new(0.0, 2.0)));
    }

    #[test]
    fn db_format_and_mhz() {
        let net = parse_str("# MHz S DB\n100 -20 180\n", Some(1)).unwrap();
        assert_eq!(net.frequencies(), &[100e6]);
        assert!(close(net.s(0, 0, 0), Complex64::new(-0.1, 0.0)));
    }

    #[test]
    fn two_port_v1_column_order() {
        let text = "# GHz S RI\n1 11 0 21 0 12 0 22 0\n";
        let net = parse_str(text, Some(2)).unwrap();
        assert_eq!(net.s(0, 0, 0).re, 11.0);
        assert_eq!(net.s(0, 1, 0).re, 21.0);
        assert_eq!(net.s(0, 0, 1).re, 12.0);
        assert_eq!(net.s(0, 1, 1).re, 22.0);
    }

    #[test]
    fn two_port_v1_noise_block_is_skipped() {
        let text = "# GHz S RI\n\
                    1 0 0 0 0 0 0 0 0\n\
                    2 0 0 0 0 0 0 0 0\n\
                    1 1.5 0.8 45 0.3\n\
                    2 1.6 0.7 50 0.3\n";
        let net = parse_str(text, Some(2)).unwrap();
        assert_eq!(net.sample_count(), 2);
    }

    #[test]
    fn three_port_wrapped_rows() {
        let text = "# Hz S RI\n\
                    10 11 0 12 0 13 0\n\
                       21 0 22 0 23 0\n\
                       31 0 32 0 33 0\n";
        let net = parse_str(text, Some(3)).unwrap();
        assert_eq!(net.sample_count(), 1);
        assert_eq!(net.s(0, 0, 2).re, 13.0);
        assert_eq!(net.s(0, 2, 0).re, 31.0);
        assert_eq!(net.s(0, 1, 1).re, 22.0);
    }

    #[test]
    fn version_two_keywords() {
        let text = "[Version] 2.0\n\
                    # GHz S RI R 50\n\
                    [Number of Ports] 2\n\
                    [Two-Port Data Order] 12_21\n\
                    [Number of Frequencies] 2\n\
                    [Reference]\n\
                    50 50\n\
                    [Network Data]\n\
                    1 11 0 12 0 21 0 22 0\n\
                    2 11 0 12 0 21 0 22 0\n\
                    [Noise Data]\n\
                    1 1.5 0.8 45 0.3\n\
                    [End]\n";
        let net = parse_str(text, None).unwrap();
        assert_eq!(net.port_count(), 2);
        assert_eq!(net.sample_count(), 2);
        assert_eq!(net.s(1, 0, 1).re, 12.0);
        assert_eq!(net.s(1, 1, 0).re, 21.0);
    }

    #[test]
    fn version_two_lower_matrix_is_mirrored() {
        let text = "[Version] 2.0\n# Hz S RI\n[Number of Ports] 3\n\
                    [Matrix Format] Lower\n[Network Data]\n\
                    5 11 0\n21 0 22 0\n31 0 32 0 33 0\n[End]\n";
        let net = parse_str(text, None).unwrap();
        assert_eq!(net.s(0, 0, 1).re, 21.0);
        assert_eq!(net.s(0, 1, 0).re, 21.0);
        assert_eq!(net.s(0, 2, 1).re, 32.0);
        assert_eq!(net.s(0, 1, 2).re, 32.0);
    }

    #[test]
    fn version_two_upper_matrix_and_khz() {
        let text = "[Version] 2.0\n# kHz S RI\n[Number of Ports] 3\n\
                    [Matrix Format] Upper\n[Network Data]\n\
                    5 11 0 12 0 13 0\n22 0 23 0\n33 0\n[End]\n";
        let net = parse_str(text, None).unwrap();
        assert_eq!(net.frequencies(), &[5e3]);
        assert_eq!(net.s(0, 0, 2).re, 13.0);
        assert_eq!(net.s(0, 2, 0).re, 13.0);
        assert_eq!(net.s(0, 1, 2).re, 23.0);
        assert_eq!(net.s(0, 2, 1).re, 23.0);
        assert_eq!(net.s(0, 2, 2).re, 33.0);
    }

    #[test]
    fn port_count_above_nine_is_rejected() {
        let huge = "[Version] 2.0\n# Hz S RI\n[Number of Ports] 5000000000\n\
                    [Network Data]\n1 0 0\n[End]\n";
        let msg = format!("{:#}", parse_str(huge, None).unwrap_err());
        assert!(msg.contains("supported 9"), "{msg}");

        let ten = format!("# Hz S RI\n1{}\n", " 0 0".repeat(100));
        assert!(parse_str(&ten, Some(10)).is_err());
        assert!(parse_str(&ten, Some(usize::MAX)).is_err());
    }

    #[test]
    fn information_block_is_ignored() {
        let text = "[Version] 2.1\n# Hz S RI\n[Number of Ports] 1\n\
                    [Begin Information]\nwhatever text 1 2 3\n[End Information]\n\
                    [Network Data]\n1 0.1 0\n[End]\n";
        assert_eq!(parse_str(text, None).unwrap().sample_count(), 1);
    }

    #[test]
    fn zero_port_network_parses() {
        let text = "[Version] 2.0\n# Hz S RI\n[Number of Ports] 0\n[Network Data]\n1\n2\n[End]\n";
        let net = parse_str(text, None).unwrap();
        assert_eq!(net.port_count(), 0);
    }

    #[test]
    fn malformed_inputs_fail() {
        assert!(parse_str("# Hz S RI\n1 abc 0\n", Some(1)).is_err());
        assert!(parse_str("# Hz S RI\n1 0.5\n", Some(1)).is_err());
        assert!(parse_str("# Hz S RI\n", Some(1)).is_err());
        assert!(parse_str("# Hz S RI\n1 0 0\n", None).is_err());
        assert!(parse_str("# Hz Z RI\n1 0 0\n", Some(1)).is_err());
        assert!(parse_str("# Hz S RI\n2 0 0\n1 0 0\n", Some(1)).is_err());
        assert!(parse_str("[Number of Frequencies] 3\n# Hz S RI\n1 0 0\n", Some(1)).is_err());
    }

    #[test]
    fn error_message_names_the_line() {
        let err = parse_str("# Hz S RI\n1 0 0\n2 x 0\n", Some(1)).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("line 3"), "{msg}");
        assert!(msg.contains("'x' is not a number"), "{msg}");
    }
}
