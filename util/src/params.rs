//! Generic parameter file loading

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read the parameter file: {0}")]
    FileLoadError(#[from] std::io::Error),

    #[error("Could not parse the parameter file: {0}")]
    DeserialiseError(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a TOML parameter file into the given parameter struct.
pub fn load<P>(param_file_path: impl AsRef<Path>) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    let params_str = read_to_string(param_file_path)?;

    Ok(toml::from_str(params_str.as_str())?)
}

/// Load a TOML parameter file, falling back to the default parameters if the
/// file does not exist.
///
/// A malformed file is still an error, only a missing one is defaulted.
pub fn load_or_default<P>(param_file_path: impl AsRef<Path>) -> Result<P, LoadError>
where
    P: DeserializeOwned + Default,
{
    if param_file_path.as_ref().exists() {
        load(param_file_path)
    } else {
        Ok(P::default())
    }
}
