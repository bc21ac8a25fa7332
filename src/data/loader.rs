use std::io;
use std::path::Path;

use anyhow::Result;

use super::error::LoadError;
use super::model::{MAX_PORTS, NetworkMeasurement, SParameterDataset};
use super::touchstone;

// ---------------------------------------------------------------------------
// Parser seam
// ---------------------------------------------------------------------------

/// Anything that can decode a network file into the in-memory contract.
pub trait NetworkSource {
    fn read_network(&self, path: &Path) -> Result<NetworkMeasurement>;
}

/// The Touchstone v1/v2 reader.
pub struct TouchstoneSource;

impl NetworkSource for TouchstoneSource {
    fn read_network(&self, path: &Path) -> Result<NetworkMeasurement> {
        touchstone::parse_file(path)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a Touchstone file (`.s1p` … `.s9p`, `.snp`, `.ts`).
pub fn load_file(path: &Path) -> Result<SParameterDataset, LoadError> {
    load_with(&TouchstoneSource, path)
}

/// Load through an arbitrary [`NetworkSource`].
///
/// * Missing path → [`LoadError::FileNotFound`], checked before the parser runs.
/// * Any parser failure → [`LoadError::InvalidFormat`] with the full context
///   chain, except an I/O `NotFound` (file vanished mid-load), which stays
///   `FileNotFound`.
/// * A network with zero ports, or more than [`MAX_PORTS`] →
///   [`LoadError::InvalidFormat`].
pub fn load_with(source: &dyn NetworkSource, path: &Path) -> Result<SParameterDataset, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let network = source.read_network(path).map_err(|e| {
        if is_not_found(&e) {
            LoadError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::InvalidFormat {
                path: path.to_path_buf(),
                message: format!("{e:#}"),
            }
        }
    })?;

    if network.port_count() == 0 {
        return Err(LoadError::InvalidFormat {
            path: path.to_path_buf(),
            message: "Loaded network has 0 ports.".to_string(),
        });
    }
    if network.port_count() > MAX_PORTS {
        return Err(LoadError::InvalidFormat {
            path: path.to_path_buf(),
            message: format!(
                "Loaded network has {} ports; at most {MAX_PORTS} are supported.",
                network.port_count()
            ),
        });
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(SParameterDataset::new(network, &filename, path))
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(|io_err| io_err.kind() == io::ErrorKind::NotFound)
}
