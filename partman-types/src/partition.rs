// SPDX-License-Identifier: GPL-3.0-only

//! Partition record - flat representation
//!
//! A [`Partition`] describes one partition, or one gap of unallocated space, on
//! a disk. Records are value snapshots: the owning controller replaces entries
//! in its ordered list to reflect edits instead of mutating them in place.

use serde::{Deserialize, Serialize};

use crate::display;
use crate::error::{PartmanError, Result};
use crate::filesystem::{FsType, OsType};
use crate::units;

/// Partition table type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionTableType {
    /// MBR/DOS (Master Boot Record)
    #[default]
    Msdos,

    /// GPT (GUID Partition Table)
    Gpt,
}

impl PartitionTableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Msdos => "msdos",
            Self::Gpt => "gpt",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "msdos" | "dos" | "mbr" => Some(Self::Msdos),
            "gpt" => Some(Self::Gpt),
            _ => None,
        }
    }

    /// Hard ceiling on entries in the primary table.
    pub fn max_primary_partitions(&self) -> usize {
        match self {
            Self::Msdos => 4,
            Self::Gpt => 128,
        }
    }

    /// Only GPT stores a per-partition name.
    pub fn supports_part_label(&self) -> bool {
        matches!(self, Self::Gpt)
    }

    /// Extended/logical partitions exist only on MBR tables.
    pub fn supports_extended(&self) -> bool {
        matches!(self, Self::Msdos)
    }
}

/// Role of a record within the partition table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionType {
    Primary,
    /// Lives inside the extended partition
    Logical,
    /// Container for logical partitions; never carries a filesystem
    Extended,
    /// Free space belonging to no partition
    #[default]
    Unallocated,
}

impl PartitionType {
    /// Primary and extended partitions each take one primary table entry.
    pub fn occupies_table_slot(self) -> bool {
        matches!(self, Self::Primary | Self::Extended)
    }

    pub fn is_partition(self) -> bool {
        !matches!(self, Self::Unallocated)
    }
}

/// Lifecycle stage of a record relative to the physical disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionStatus {
    /// Exists on disk
    #[default]
    Real,
    /// Staged for creation
    New,
    /// Staged for formatting
    Formatted,
}

impl PartitionStatus {
    /// `New -> Formatted`, `New -> Real` and `Formatted -> Real`. A record
    /// committed to disk never goes back to a staged state.
    pub fn can_transition_to(self, next: PartitionStatus) -> bool {
        use PartitionStatus::*;
        matches!(
            (self, next),
            (Real, Real)
                | (New, New)
                | (New, Formatted)
                | (New, Real)
                | (Formatted, Formatted)
                | (Formatted, Real)
        )
    }

    pub fn is_pending(self) -> bool {
        !matches!(self, Self::Real)
    }
}

/// One partition, or one unallocated gap, on a disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Device path of the disk (e.g., "/dev/sda")
    pub device_path: String,

    /// Partition node (e.g., "/dev/sda1"), empty for unallocated space
    pub path: String,

    /// Filesystem UUID
    pub uuid: Option<String>,

    /// Filesystem label
    pub label: Option<String>,

    /// Partition name; only GPT tables support it
    pub part_label: Option<String>,

    /// 1-based partition number, `None` for unallocated or not yet numbered
    pub partition_number: Option<u32>,

    #[serde(rename = "type")]
    pub kind: PartitionType,

    pub status: PartitionStatus,

    pub fs: FsType,

    /// Operating system installed on this partition, if recognized
    pub os: OsType,

    /// Sector size of the disk device, needed to convert sectors to bytes
    pub sector_size: u64,

    /// Filesystem size in bytes, set only if the partition has a filesystem
    pub length: Option<u64>,

    /// Unused filesystem bytes
    pub freespace: Option<u64>,

    /// First sector (inclusive)
    pub sector_start: u64,

    /// Last sector (inclusive)
    pub sector_end: u64,

    /// Unallocated sectors left before this partition while planning it.
    /// When set, an unallocated record is created there afterwards.
    pub sectors_unallocated_preceding: Option<u64>,

    /// Unallocated sectors left after this partition while planning it.
    pub sectors_unallocated_succeeding: Option<u64>,

    pub mount_point: Option<String>,
}

impl Partition {
    /// Build an unallocated record covering `sector_start..=sector_end`.
    pub fn unallocated(
        device_path: impl Into<String>,
        sector_start: u64,
        sector_end: u64,
        sector_size: u64,
    ) -> Result<Self> {
        check_range(sector_start, sector_end)?;
        if sector_size == 0 {
            return Err(PartmanError::ZeroSectorSize);
        }

        Ok(Self {
            device_path: device_path.into(),
            kind: PartitionType::Unallocated,
            sector_size,
            sector_start,
            sector_end,
            ..Self::default()
        })
    }

    /// Length in sectors.
    pub fn sector_length(&self) -> Result<u64> {
        check_range(self.sector_start, self.sector_end)?;
        (self.sector_end - self.sector_start)
            .checked_add(1)
            .ok_or(PartmanError::SectorCountOverflow {
                sector_start: self.sector_start,
                sector_end: self.sector_end,
            })
    }

    /// Actual partition size in bytes.
    ///
    /// The filesystem-reported `length` wins when present, since a filesystem
    /// may be smaller than its container. Otherwise the raw sector span is
    /// converted with `sector_size`.
    pub fn byte_length(&self) -> Result<u64> {
        match self.length {
            Some(length) if length > 0 => Ok(length),
            _ => units::sectors_to_bytes(self.sector_length()?, self.sector_size),
        }
    }

    /// A sector inside this partition, for sector-to-partition lookups.
    pub fn representative_sector(&self) -> Result<u64> {
        check_range(self.sector_start, self.sector_end)?;
        Ok(self.sector_start)
    }

    pub fn contains_sector(&self, sector: u64) -> bool {
        self.sector_start <= sector && sector <= self.sector_end
    }

    /// Whether this record's sector range lies inside `outer`.
    pub fn is_within(&self, outer: &Partition) -> bool {
        outer.sector_start <= self.sector_start && self.sector_end <= outer.sector_end
    }

    pub fn is_unallocated(&self) -> bool {
        self.kind == PartitionType::Unallocated
    }

    /// Check the record-level invariants.
    pub fn validate(&self) -> Result<()> {
        check_range(self.sector_start, self.sector_end)?;

        if self.partition_number == Some(0) {
            return Err(PartmanError::invalid_record("partition numbers are 1-based"));
        }

        match self.kind {
            PartitionType::Extended if self.fs != FsType::Empty => {
                return Err(PartmanError::invalid_record(format!(
                    "extended partition carries filesystem {}",
                    self.fs
                )));
            }
            PartitionType::Unallocated => {
                if self.uuid.is_some() || self.label.is_some() || self.mount_point.is_some() {
                    return Err(PartmanError::invalid_record(
                        "unallocated space has a uuid, label or mount point",
                    ));
                }
                if self.partition_number.is_some() {
                    return Err(PartmanError::invalid_record(
                        "unallocated space has a partition number",
                    ));
                }
            }
            _ => {}
        }

        if self.mount_point.is_some() && !self.fs.supports_mount_point() {
            return Err(PartmanError::invalid_record(format!(
                "filesystem '{}' cannot have a mount point",
                self.fs
            )));
        }

        Ok(())
    }

    /// [`Partition::validate`] plus the checks that depend on the table format.
    pub fn validate_for_table(&self, table_type: PartitionTableType) -> Result<()> {
        self.validate()?;

        if self.part_label.is_some() && !table_type.supports_part_label() {
            return Err(PartmanError::invalid_record(format!(
                "{} tables do not support partition labels",
                table_type.as_str()
            )));
        }

        if matches!(self.kind, PartitionType::Extended | PartitionType::Logical)
            && !table_type.supports_extended()
        {
            return Err(PartmanError::invalid_record(format!(
                "{} tables have no extended or logical partitions",
                table_type.as_str()
            )));
        }

        Ok(())
    }

    /// Produce the record with its status advanced to `next`.
    ///
    /// Moving to [`PartitionStatus::Real`] drops the planning-only
    /// `sectors_unallocated_*` fields.
    pub fn with_status(mut self, next: PartitionStatus) -> Result<Self> {
        if !self.status.can_transition_to(next) {
            return Err(PartmanError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        if next == PartitionStatus::Real {
            self.sectors_unallocated_preceding = None;
            self.sectors_unallocated_succeeding = None;
        }
        Ok(self)
    }

    /// Fraction of the filesystem in use, 0 when unknown.
    pub fn usage_fraction(&self) -> f64 {
        match (self.freespace, self.byte_length()) {
            (Some(freespace), Ok(total)) => units::usage_fraction(freespace, total),
            _ => 0.0,
        }
    }

    /// Human readable usage, e.g. "12/50G".
    pub fn usage_text(&self) -> String {
        match self.byte_length() {
            Ok(total) => display::usage_text(self.freespace, total),
            Err(_) => display::usage_text(None, 0),
        }
    }
}

fn check_range(sector_start: u64, sector_end: u64) -> Result<()> {
    if sector_end < sector_start {
        return Err(PartmanError::InvertedSectorRange {
            sector_start,
            sector_end,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn ext4_partition() -> Partition {
        Partition {
            device_path: "/dev/sda".to_string(),
            path: "/dev/sda1".to_string(),
            uuid: Some("0b7a36f1-0f0e-4c53-9d1b-2a3c61b0c1d2".to_string()),
            label: Some("root".to_string()),
            partition_number: Some(1),
            kind: PartitionType::Primary,
            fs: FsType::Ext4,
            os: OsType::Linux,
            sector_size: 512,
            sector_start: 2048,
            sector_end: 4095,
            mount_point: Some("/".to_string()),
            ..Partition::default()
        }
    }

    #[test]
    fn sector_length_is_inclusive() {
        let partition = ext4_partition();
        assert_eq!(partition.sector_length().unwrap(), 2048);

        let single = Partition {
            sector_start: 7,
            sector_end: 7,
            ..ext4_partition()
        };
        assert_eq!(single.sector_length().unwrap(), 1);
    }

    #[test]
    fn inverted_range_is_invalid_geometry() {
        let partition = Partition {
            sector_start: 100,
            sector_end: 99,
            ..ext4_partition()
        };
        let error = partition.sector_length().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidGeometry);
        assert!(partition.byte_length().is_err());
        assert!(partition.representative_sector().is_err());
        assert!(partition.validate().is_err());
    }

    #[test]
    fn byte_length_prefers_filesystem_length() {
        let partition = Partition {
            length: Some(1_000_000),
            ..ext4_partition()
        };
        assert_eq!(partition.byte_length().unwrap(), 1_000_000);
    }

    #[test]
    fn byte_length_falls_back_to_geometry() {
        let partition = ext4_partition();
        assert_eq!(partition.byte_length().unwrap(), 2048 * 512);

        let zero_length = Partition {
            length: Some(0),
            ..ext4_partition()
        };
        assert_eq!(zero_length.byte_length().unwrap(), 2048 * 512);
    }

    #[test]
    fn byte_length_refuses_zero_sector_size() {
        let partition = Partition {
            sector_size: 0,
            ..ext4_partition()
        };
        assert_eq!(partition.byte_length(), Err(PartmanError::ZeroSectorSize));
    }

    #[test]
    fn byte_length_refuses_overflow() {
        let partition = Partition {
            sector_start: 0,
            sector_end: u64::MAX - 1,
            sector_size: 4096,
            ..ext4_partition()
        };
        assert!(matches!(
            partition.byte_length(),
            Err(PartmanError::ByteLengthOverflow { .. })
        ));
    }

    #[test]
    fn full_u64_range_is_rejected() {
        let partition = Partition {
            sector_start: 0,
            sector_end: u64::MAX,
            ..ext4_partition()
        };
        assert!(partition.sector_length().unwrap_err().is_invalid_geometry());
    }

    #[test]
    fn representative_sector_lies_inside() {
        let partition = ext4_partition();
        let sector = partition.representative_sector().unwrap();
        assert!(partition.contains_sector(sector));
        assert_eq!(sector, partition.sector_start);
    }

    #[test]
    fn unallocated_constructor_validates() {
        let free = Partition::unallocated("/dev/sda", 4096, 8191, 512).unwrap();
        assert!(free.is_unallocated());
        assert_eq!(free.byte_length().unwrap(), 4096 * 512);
        assert!(free.validate().is_ok());

        assert!(Partition::unallocated("/dev/sda", 10, 9, 512).is_err());
        assert_eq!(
            Partition::unallocated("/dev/sda", 0, 9, 0),
            Err(PartmanError::ZeroSectorSize)
        );
    }

    #[test]
    fn extended_partition_cannot_carry_filesystem() {
        let extended = Partition {
            kind: PartitionType::Extended,
            fs: FsType::Ext4,
            mount_point: None,
            ..ext4_partition()
        };
        assert_eq!(
            extended.validate().unwrap_err().kind(),
            ErrorKind::InvalidRecord
        );
    }

    #[test]
    fn unallocated_space_has_no_identity() {
        let mut free = Partition::unallocated("/dev/sda", 0, 2047, 512).unwrap();
        free.label = Some("data".to_string());
        assert!(free.validate().is_err());
    }

    #[test]
    fn swap_cannot_be_given_a_mount_point() {
        let swap = Partition {
            fs: FsType::LinuxSwap,
            mount_point: Some("/swap".to_string()),
            ..ext4_partition()
        };
        assert!(swap.validate().is_err());
    }

    #[test]
    fn part_label_requires_gpt() {
        let named = Partition {
            part_label: Some("Linux root".to_string()),
            ..ext4_partition()
        };
        assert!(named.validate_for_table(PartitionTableType::Gpt).is_ok());
        assert!(named.validate_for_table(PartitionTableType::Msdos).is_err());
    }

    #[test]
    fn status_transitions_follow_lifecycle() {
        use PartitionStatus::*;
        assert!(New.can_transition_to(Formatted));
        assert!(New.can_transition_to(Real));
        assert!(Formatted.can_transition_to(Real));
        assert!(!Real.can_transition_to(New));
        assert!(!Real.can_transition_to(Formatted));
        assert!(!Formatted.can_transition_to(New));
    }

    #[test]
    fn committing_drops_planning_fields() {
        let staged = Partition {
            status: PartitionStatus::New,
            sectors_unallocated_preceding: Some(0),
            sectors_unallocated_succeeding: Some(2048),
            ..ext4_partition()
        };
        let committed = staged.clone().with_status(PartitionStatus::Real).unwrap();
        assert_eq!(committed.status, PartitionStatus::Real);
        assert_eq!(committed.sectors_unallocated_preceding, None);
        assert_eq!(committed.sectors_unallocated_succeeding, None);

        let formatted = staged.with_status(PartitionStatus::Formatted).unwrap();
        assert_eq!(formatted.sectors_unallocated_succeeding, Some(2048));
    }

    #[test]
    fn real_partition_cannot_be_restaged() {
        let error = ext4_partition()
            .with_status(PartitionStatus::New)
            .unwrap_err();
        assert_eq!(
            error,
            PartmanError::InvalidTransition {
                from: PartitionStatus::Real,
                to: PartitionStatus::New,
            }
        );
    }

    #[test]
    fn usage_never_panics_without_freespace() {
        let partition = ext4_partition();
        assert_eq!(partition.usage_fraction(), 0.0);
        assert_eq!(partition.usage_text(), "-/0G");

        let broken = Partition {
            sector_size: 0,
            ..ext4_partition()
        };
        assert_eq!(broken.usage_fraction(), 0.0);
        assert_eq!(broken.usage_text(), "-/0G");
    }

    #[test]
    fn usage_uses_filesystem_length() {
        let partition = Partition {
            length: Some(100 * units::GIB),
            freespace: Some(25 * units::GIB),
            ..ext4_partition()
        };
        assert_eq!(partition.usage_fraction(), 0.75);
        assert_eq!(partition.usage_text(), "75/100G");
    }

    #[test]
    fn equality_is_field_by_field() {
        let a = ext4_partition();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.freespace = Some(1);
        assert_ne!(a, b);
    }

    #[test]
    fn partition_serialization_roundtrips() {
        let partition = ext4_partition();
        let json = serde_json::to_string(&partition).unwrap();
        assert!(json.contains("\"type\":\"primary\""));
        let deserialized: Partition = serde_json::from_str(&json).unwrap();
        assert_eq!(partition, deserialized);
    }
}
