use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use num_complex::Complex64;

/// Third-order Butterworth low-pass transfer function at normalised `s`.
fn butterworth3(s: Complex64) -> Complex64 {
    let one = Complex64::new(1.0, 0.0);
    one / ((s + one) * (s * s + s + one))
}

/// Lossless, reciprocal, symmetric 2-port built from the through response.
fn filter_response(freq_hz: f64, cutoff_hz: f64, noise: Complex64) -> (Complex64, Complex64) {
    let s21 = butterworth3(Complex64::new(0.0, freq_hz / cutoff_hz)) + noise;
    let reflected = (1.0 - s21.norm_sqr()).max(0.0).sqrt();
    let s11 = Complex64::from_polar(reflected, s21.arg() + std::f64::consts::FRAC_PI_2);
    (s11, s21)
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() -> Result<()> {
    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data/filter.s2p"));

    let mut rng = SimpleRng::new(42);
    let cutoff_hz = 2.4e9;
    // 10 MHz → 6 GHz, 201 points
    let frequencies: Vec<f64> = (0..201).map(|i| 10e6 + i as f64 * 29.95e6).collect();

    let mut text = String::new();
    writeln!(text, "! Synthetic 3rd-order low-pass filter, fc = {} GHz", cutoff_hz / 1e9)?;
    writeln!(text, "! Columns: f S11 S21 S12 S22 (real/imag)")?;
    writeln!(text, "# GHz S RI R 50")?;

    for &f in &frequencies {
        let noise = Complex64::new(rng.gauss(0.0, 0.002), rng.gauss(0.0, 0.002));
        let (s11, s21) = filter_response(f, cutoff_hz, noise);
        write!(text, "{:.6}", f / 1e9)?;
        for z in [s11, s21, s21, s11] {
            write!(text, " {:.9} {:.9}", z.re, z.im)?;
        }
        writeln!(text)?;
    }

    if let Some(dir) = output_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    std::fs::write(&output_path, text)
        .with_context(|| format!("writing {}", output_path.display()))?;

    println!(
        "Wrote 2-port network ({} frequencies) to {}",
        frequencies.len(),
        output_path.display()
    );
    Ok(())
}
