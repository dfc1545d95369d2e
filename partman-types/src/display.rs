// SPDX-License-Identifier: GPL-3.0-only

//! Presentation helpers for partition lists
//!
//! Text produced here is for display only; nothing downstream parses it.

use crate::filesystem::FsType;
use crate::partition::Partition;
use crate::units::to_gibibytes;

/// Partition name based on its device path ("/dev/sda1" -> "sda1").
pub fn partition_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// "label(name)" when the filesystem has a label, the bare name otherwise.
pub fn label_and_path(partition: &Partition) -> String {
    if partition.is_unallocated() {
        return "Unallocated".to_string();
    }

    let name = partition_name(&partition.path);
    match partition.label.as_deref() {
        Some(label) if !label.is_empty() => format!("{label}({name})"),
        _ => name.to_string(),
    }
}

/// Usage as "used/totalG"; "-/totalG" when free space is unknown or bogus.
pub fn usage_text(freespace: Option<u64>, total: u64) -> String {
    match freespace {
        Some(freespace) if total > 0 && freespace <= total => format!(
            "{}/{}G",
            to_gibibytes(total - freespace),
            to_gibibytes(total)
        ),
        _ => format!("-/{}G", to_gibibytes(total)),
    }
}

/// Human readable filesystem name.
pub fn local_fs_type_name(fs: FsType) -> &'static str {
    match fs {
        FsType::Empty => "Unformatted",
        FsType::Efi => "EFI system partition",
        FsType::LinuxSwap => "Swap area",
        FsType::Lvm2Pv => "LVM physical volume",
        FsType::HfsPlus => "HFS+",
        FsType::Unknown => "Unknown",
        other => other.as_str(),
    }
}

/// Check whether the user may pick a mount point for `fs`.
pub fn supports_mount_point(fs: FsType) -> bool {
    fs.supports_mount_point()
}
