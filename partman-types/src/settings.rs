// SPDX-License-Identifier: GPL-3.0-only

//! Installer partitioning settings
//!
//! Passed explicitly by the caller; the model never reads global state.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PartmanError, Result};
use crate::filesystem::FsType;
use crate::partition::{Partition, PartitionTableType, PartitionType};
use crate::table;
use crate::units::GIB;

/// Partitioning policy of the installer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionSettings {
    /// Table format used when the installer creates a new table
    pub table_type: PartitionTableType,

    /// Filesystem offered for new partitions
    pub default_fs: FsType,

    /// Smallest disk the installer accepts, in GiB
    pub minimum_disk_space_gib: u64,

    /// Disk size below which the user is warned, in GiB
    pub recommended_disk_space_gib: u64,

    /// Create logical rather than primary partitions on MBR disks when possible
    pub prefer_logical_partition: bool,

    /// New partitions start on a multiple of this many sectors
    pub alignment_sectors: u64,
}

impl Default for PartitionSettings {
    fn default() -> Self {
        Self {
            table_type: PartitionTableType::Msdos,
            default_fs: FsType::Ext4,
            minimum_disk_space_gib: 16,
            recommended_disk_space_gib: 64,
            prefer_logical_partition: false,
            alignment_sectors: 2048,
        }
    }
}

impl PartitionSettings {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(raw).map_err(|error| PartmanError::InvalidSettings(error.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.alignment_sectors == 0 {
            return Err(PartmanError::InvalidSettings(
                "alignment_sectors must be greater than zero".to_string(),
            ));
        }

        if self.minimum_disk_space_gib > self.recommended_disk_space_gib {
            return Err(PartmanError::InvalidSettings(format!(
                "minimum_disk_space_gib ({}) exceeds recommended_disk_space_gib ({})",
                self.minimum_disk_space_gib, self.recommended_disk_space_gib
            )));
        }

        if matches!(self.default_fs, FsType::Empty | FsType::Unknown | FsType::Others) {
            return Err(PartmanError::InvalidSettings(format!(
                "default_fs '{}' is not a creatable filesystem",
                self.default_fs
            )));
        }

        Ok(())
    }

    pub fn meets_minimum(&self, disk_bytes: u64) -> bool {
        disk_bytes >= self.minimum_disk_space_gib.saturating_mul(GIB)
    }

    pub fn meets_recommended(&self, disk_bytes: u64) -> bool {
        disk_bytes >= self.recommended_disk_space_gib.saturating_mul(GIB)
    }

    /// Type to give a partition the user stages on a disk laid out as
    /// `partitions`, or `None` if the table has no room for one.
    pub fn preferred_new_partition_type(&self, partitions: &[Partition]) -> Option<PartitionType> {
        let table_type = self.table_type;
        let primary = table::can_create_primary(partitions, table_type);
        let logical = table::can_create_logical(partitions, table_type);

        let chosen = if self.prefer_logical_partition && logical {
            Some(PartitionType::Logical)
        } else if primary {
            Some(PartitionType::Primary)
        } else if logical {
            Some(PartitionType::Logical)
        } else {
            None
        };

        debug!(
            table = table_type.as_str(),
            primary, logical, ?chosen, "picked new partition type"
        );
        chosen
    }
}
