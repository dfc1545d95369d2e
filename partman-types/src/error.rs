// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::partition::PartitionStatus;

/// Broad category of a [`PartmanError`], used by callers to decide whether a
/// destructive operation must be blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidGeometry,
    InvalidRecord,
    InvalidInput,
    NotFound,
}

/// Error types for partition layout computations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartmanError {
    #[error("invalid geometry: sector_end {sector_end} precedes sector_start {sector_start}")]
    InvertedSectorRange { sector_start: u64, sector_end: u64 },

    #[error("invalid geometry: sectors {sector_start}..={sector_end} overflow a sector count")]
    SectorCountOverflow { sector_start: u64, sector_end: u64 },

    #[error("invalid geometry: sector size is zero")]
    ZeroSectorSize,

    #[error("invalid geometry: {sectors} sectors of {sector_size} bytes overflow a byte count")]
    ByteLengthOverflow { sectors: u64, sector_size: u64 },

    #[error("invalid partition record: {reason}")]
    InvalidRecord { reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("cannot change partition status from {from:?} to {to:?}")]
    InvalidTransition {
        from: PartitionStatus,
        to: PartitionStatus,
    },

    #[error("sectors {sector_start}..={sector_end} are not unallocated space")]
    NotUnallocated { sector_start: u64, sector_end: u64 },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("index {index} is out of range for {len} partitions")]
    IndexOutOfRange { index: usize, len: usize },
}

impl PartmanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvertedSectorRange { .. }
            | Self::SectorCountOverflow { .. }
            | Self::ZeroSectorSize
            | Self::ByteLengthOverflow { .. } => ErrorKind::InvalidGeometry,
            Self::InvalidRecord { .. } => ErrorKind::InvalidRecord,
            Self::InvalidRequest(_)
            | Self::InvalidTransition { .. }
            | Self::NotUnallocated { .. }
            | Self::InvalidSettings(_) => ErrorKind::InvalidInput,
            Self::IndexOutOfRange { .. } => ErrorKind::NotFound,
        }
    }

    pub fn is_invalid_geometry(&self) -> bool {
        self.kind() == ErrorKind::InvalidGeometry
    }

    pub(crate) fn invalid_record(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }
}

/// Result type alias for partition layout computations
pub type Result<T> = std::result::Result<T, PartmanError>;
