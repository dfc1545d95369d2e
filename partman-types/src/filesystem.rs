// SPDX-License-Identifier: GPL-3.0-only

//! Filesystem and operating-system tags attached to a partition record

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Filesystem found on (or requested for) a partition.
///
/// Serialized as its canonical name (see [`FsType::as_str`]), so layout
/// fixtures can write `fs = "linux-swap"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum FsType {
    /// No filesystem (unformatted, extended or unallocated space)
    #[default]
    Empty,
    Btrfs,
    /// EFI system partition (FAT formatted, mounted at a fixed location)
    Efi,
    Ext2,
    Ext3,
    Ext4,
    F2fs,
    Fat16,
    Fat32,
    Hfs,
    HfsPlus,
    Jfs,
    LinuxSwap,
    /// LVM2 physical volume
    Lvm2Pv,
    Ntfs,
    /// A recognized filesystem with no dedicated tag
    Others,
    Reiser4,
    Reiserfs,
    Xfs,
    /// Probing found data it could not identify
    Unknown,
}

impl FsType {
    pub const ALL: [FsType; 20] = [
        FsType::Empty,
        FsType::Btrfs,
        FsType::Efi,
        FsType::Ext2,
        FsType::Ext3,
        FsType::Ext4,
        FsType::F2fs,
        FsType::Fat16,
        FsType::Fat32,
        FsType::Hfs,
        FsType::HfsPlus,
        FsType::Jfs,
        FsType::LinuxSwap,
        FsType::Lvm2Pv,
        FsType::Ntfs,
        FsType::Others,
        FsType::Reiser4,
        FsType::Reiserfs,
        FsType::Xfs,
        FsType::Unknown,
    ];

    /// Canonical lowercase name, as used by the partitioning toolkit.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "",
            Self::Btrfs => "btrfs",
            Self::Efi => "efi",
            Self::Ext2 => "ext2",
            Self::Ext3 => "ext3",
            Self::Ext4 => "ext4",
            Self::F2fs => "f2fs",
            Self::Fat16 => "fat16",
            Self::Fat32 => "fat32",
            Self::Hfs => "hfs",
            Self::HfsPlus => "hfs+",
            Self::Jfs => "jfs",
            Self::LinuxSwap => "linux-swap",
            Self::Lvm2Pv => "lvm2pv",
            Self::Ntfs => "ntfs",
            Self::Others => "others",
            Self::Reiser4 => "reiser4",
            Self::Reiserfs => "reiserfs",
            Self::Xfs => "xfs",
            Self::Unknown => "unknown",
        }
    }

    /// Parse from a filesystem name, accepting the aliases reported by
    /// blkid/lsblk. Unrecognized names map to [`FsType::Unknown`].
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "" | "empty" | "none" => Self::Empty,
            "btrfs" => Self::Btrfs,
            "efi" | "esp" => Self::Efi,
            "ext2" => Self::Ext2,
            "ext3" => Self::Ext3,
            "ext4" => Self::Ext4,
            "f2fs" => Self::F2fs,
            "fat16" => Self::Fat16,
            "fat32" | "vfat" | "fat" => Self::Fat32,
            "hfs" => Self::Hfs,
            "hfs+" | "hfsplus" => Self::HfsPlus,
            "jfs" => Self::Jfs,
            "linux-swap" | "linux-swap(v1)" | "swap" => Self::LinuxSwap,
            "lvm2pv" | "lvm2_member" | "lvm" => Self::Lvm2Pv,
            "ntfs" | "ntfs-3g" | "ntfs3" => Self::Ntfs,
            "others" => Self::Others,
            "reiser4" => Self::Reiser4,
            "reiserfs" => Self::Reiserfs,
            "xfs" => Self::Xfs,
            _ => Self::Unknown,
        }
    }

    /// Whether the partition holds a concrete filesystem.
    pub fn is_formatted(self) -> bool {
        !matches!(self, Self::Empty | Self::Unknown)
    }

    /// Check whether a user may choose a mount point for this filesystem.
    ///
    /// Swap and EFI system partitions are mounted at fixed locations, and
    /// LVM physical volumes or unformatted space cannot be mounted at all.
    pub fn supports_mount_point(self) -> bool {
        !matches!(
            self,
            Self::LinuxSwap | Self::Efi | Self::Lvm2Pv | Self::Empty | Self::Unknown
        )
    }
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FsType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for FsType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<FsType> for String {
    fn from(value: FsType) -> Self {
        value.as_str().to_string()
    }
}

/// Operating system detected on a partition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum OsType {
    /// No operating system detected
    #[default]
    Empty,
    Linux,
    Mac,
    Unknown,
    Windows,
}

impl OsType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "",
            Self::Linux => "linux",
            Self::Mac => "mac",
            Self::Unknown => "unknown",
            Self::Windows => "windows",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "" | "empty" | "none" => Self::Empty,
            "linux" => Self::Linux,
            "mac" | "macos" | "osx" => Self::Mac,
            "windows" => Self::Windows,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for OsType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<OsType> for String {
    fn from(value: OsType) -> Self {
        value.as_str().to_string()
    }
}
