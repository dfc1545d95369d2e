use std::fs;
use std::path::{Path, PathBuf};

use partman_types::{
    FsType, OsType, Partition, PartitionStatus, PartitionTableType, PartitionType,
};
use serde::{Deserialize, Serialize};

use crate::errors::{LabError, Result};

/// A disk layout fixture, as a disk scanner would report it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub name: String,
    pub device_path: String,
    pub sector_size: u64,
    pub table_type: String,
    #[serde(default)]
    pub partitions: Vec<PartitionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub number: Option<u32>,
    pub path: Option<String>,
    pub r#type: PartitionType,
    #[serde(default)]
    pub status: PartitionStatus,
    #[serde(default)]
    pub fs: FsType,
    #[serde(default)]
    pub os: OsType,
    pub start: u64,
    pub end: u64,
    pub length: Option<u64>,
    pub freespace: Option<u64>,
    pub uuid: Option<String>,
    pub label: Option<String>,
    pub part_label: Option<String>,
    pub mount_point: Option<String>,
}

impl LayoutSpec {
    pub fn table_kind(&self) -> Result<PartitionTableType> {
        PartitionTableType::parse(&self.table_type).ok_or_else(|| LabError::SpecInvalid {
            spec_name: self.name.clone(),
            reason: format!(
                "table_type must be 'msdos' or 'gpt', got '{}'",
                self.table_type
            ),
        })
    }

    /// Partition records in fixture order.
    ///
    /// Each record is checked on its own; cross-record problems are left to
    /// [`partman_types::validate_layout_for_table`] so they can be reported.
    pub fn to_partitions(&self) -> Result<Vec<Partition>> {
        let table_type = self.table_kind()?;

        self.partitions
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let partition = spec.to_partition(&self.device_path, self.sector_size);
                partition
                    .validate_for_table(table_type)
                    .map_err(|source| LabError::Partition {
                        spec_name: self.name.clone(),
                        index,
                        source,
                    })?;
                Ok(partition)
            })
            .collect()
    }
}

impl PartitionSpec {
    pub fn to_partition(&self, device_path: &str, sector_size: u64) -> Partition {
        let path = match (&self.path, self.number) {
            (Some(path), _) => path.clone(),
            (None, Some(number)) => partition_path(device_path, number),
            (None, None) => String::new(),
        };

        Partition {
            device_path: device_path.to_string(),
            path,
            uuid: self.uuid.clone(),
            label: self.label.clone(),
            part_label: self.part_label.clone(),
            partition_number: self.number,
            kind: self.r#type,
            status: self.status,
            fs: self.fs,
            os: self.os,
            sector_size,
            length: self.length,
            freespace: self.freespace,
            sector_start: self.start,
            sector_end: self.end,
            sectors_unallocated_preceding: None,
            sectors_unallocated_succeeding: None,
            mount_point: self.mount_point.clone(),
        }
    }
}

/// Kernel naming: "/dev/sda" + 1 -> "/dev/sda1", "/dev/nvme0n1" + 1 -> "/dev/nvme0n1p1".
pub fn partition_path(device_path: &str, number: u32) -> String {
    if device_path.ends_with(|c: char| c.is_ascii_digit()) {
        format!("{device_path}p{number}")
    } else {
        format!("{device_path}{number}")
    }
}

pub fn workspace_root() -> PathBuf {
    if let Ok(value) = std::env::var("PARTMAN_LAB_WORKSPACE_ROOT") {
        return PathBuf::from(value);
    }

    if let Ok(current_dir) = std::env::current_dir()
        && current_dir.join("resources/layouts").exists()
    {
        return current_dir;
    }

    let manifest_root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    if manifest_root.join("resources/layouts").exists() {
        return manifest_root;
    }

    PathBuf::from(".")
}

pub fn layouts_root() -> PathBuf {
    workspace_root().join("resources/layouts")
}

pub fn spec_path_for_name(spec_name: &str) -> PathBuf {
    layouts_root().join(format!("{}.toml", spec_name))
}

/// Load a layout by fixture name, or by path when `spec` names a file.
pub fn load(spec: &str) -> Result<LayoutSpec> {
    if spec.ends_with(".toml") || spec.contains('/') {
        load_from_path(Path::new(spec))
    } else {
        load_by_name(spec)
    }
}

pub fn load_by_name(spec_name: &str) -> Result<LayoutSpec> {
    let path = spec_path_for_name(spec_name);
    if !path.exists() {
        return Err(LabError::SpecNotFound {
            spec_name: spec_name.to_string(),
        });
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<LayoutSpec> {
    let spec_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let raw = fs::read_to_string(path).map_err(|error| LabError::SpecInvalid {
        spec_name: spec_name.clone(),
        reason: error.to_string(),
    })?;

    parse(&spec_name, &raw)
}

pub fn parse(spec_name: &str, raw: &str) -> Result<LayoutSpec> {
    let spec: LayoutSpec = toml::from_str(raw).map_err(|error| LabError::SpecInvalid {
        spec_name: spec_name.to_string(),
        reason: error.to_string(),
    })?;

    validate(&spec)?;
    Ok(spec)
}

pub fn validate(spec: &LayoutSpec) -> Result<()> {
    if spec.name.is_empty() {
        return Err(LabError::SpecInvalid {
            spec_name: "<unknown>".to_string(),
            reason: "name must not be empty".to_string(),
        });
    }

    if spec.device_path.is_empty() {
        return Err(LabError::SpecInvalid {
            spec_name: spec.name.clone(),
            reason: "device_path must not be empty".to_string(),
        });
    }

    if spec.sector_size == 0 {
        return Err(LabError::SpecInvalid {
            spec_name: spec.name.clone(),
            reason: "sector_size must be greater than zero".to_string(),
        });
    }

    spec.table_kind()?;
    Ok(())
}
