/// Data layer: core types, loading, and frequency masking.
///
/// Architecture:
/// ```text
///  .s1p … .s9p / .snp / .ts
///        │
///        ▼
///   ┌────────────┐
///   │ touchstone │  parse text → NetworkMeasurement (Hz, N×P×P complex)
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  existence check, error taxonomy, file metadata
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ SParameterDataset │  parameter names, complex / dB / degree series
///   └──────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  frequency window → absolute sample indices
///   └──────────┘
/// ```

pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod touchstone;
