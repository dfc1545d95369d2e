use std::path::PathBuf;

use partman_types::PartmanError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabError {
    #[error("layout spec not found for '{spec_name}' in resources/layouts")]
    SpecNotFound { spec_name: String },
    #[error("invalid layout spec '{spec_name}': {reason}")]
    SpecInvalid { spec_name: String, reason: String },
    #[error("partition {index} of '{spec_name}': {source}")]
    Partition {
        spec_name: String,
        index: usize,
        #[source]
        source: PartmanError,
    },
    #[error("settings file {path:?}: {reason}")]
    Settings { path: PathBuf, reason: String },
    #[error(transparent)]
    Partman(#[from] PartmanError),
    #[error("log file {path:?}: {reason}")]
    LogFile { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, LabError>;
