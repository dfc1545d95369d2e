use std::fmt;

use partman_types::{
    FsType, LayoutAnomaly, Partition, PartitionStatus, PartitionTableType, PartitionType,
    count_primaries, find_extended_partition_index, format_bytes, label_and_path,
    local_fs_type_name, primary_slots_available, to_gibibytes, validate_layout_for_table,
};
use partman_types::units::sectors_to_bytes;
use serde::Serialize;
use tracing::warn;

/// One line of the partition list, already formatted for display.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionRow {
    pub index: usize,
    pub name: String,
    pub r#type: PartitionType,
    pub status: PartitionStatus,
    pub fs: FsType,
    pub fs_name: String,
    pub sector_start: u64,
    pub sector_end: u64,
    pub size_bytes: Option<u64>,
    pub size_gib: Option<u64>,
    pub size: String,
    pub usage: String,
    pub mount_point: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutReport {
    pub name: String,
    pub device_path: String,
    pub table_type: PartitionTableType,
    pub rows: Vec<PartitionRow>,
    pub primaries: usize,
    pub primary_slots_available: usize,
    pub extended_index: Option<usize>,
    pub anomalies: Vec<LayoutAnomaly>,
}

impl LayoutReport {
    pub fn build(
        name: &str,
        device_path: &str,
        table_type: PartitionTableType,
        partitions: &[Partition],
    ) -> Self {
        let rows = partitions
            .iter()
            .enumerate()
            .map(|(index, partition)| row(index, partition))
            .collect();

        Self {
            name: name.to_string(),
            device_path: device_path.to_string(),
            table_type,
            rows,
            primaries: count_primaries(partitions),
            primary_slots_available: primary_slots_available(partitions, table_type),
            extended_index: find_extended_partition_index(partitions),
            anomalies: validate_layout_for_table(partitions, table_type),
        }
    }

    pub fn has_blocking_anomalies(&self) -> bool {
        self.anomalies.iter().any(LayoutAnomaly::is_blocking)
    }
}

/// Bytes of disk the layout covers, taken from sector ranges. Records inside
/// the extended partition are counted through it.
pub fn disk_bytes(partitions: &[Partition]) -> partman_types::Result<u64> {
    let extended = find_extended_partition_index(partitions);

    partitions
        .iter()
        .enumerate()
        .filter(|(index, partition)| match extended {
            Some(extended) => *index == extended || !partition.is_within(&partitions[extended]),
            None => true,
        })
        .map(|(_, partition)| {
            partition
                .sector_length()
                .and_then(|sectors| sectors_to_bytes(sectors, partition.sector_size))
        })
        .try_fold(0u64, |total, bytes| bytes.map(|bytes| total.saturating_add(bytes)))
}

fn row(index: usize, partition: &Partition) -> PartitionRow {
    let size_bytes = match partition.byte_length() {
        Ok(bytes) => Some(bytes),
        Err(error) => {
            warn!(index, path = %partition.path, %error, "size unavailable");
            None
        }
    };

    PartitionRow {
        index,
        name: label_and_path(partition),
        r#type: partition.kind,
        status: partition.status,
        fs: partition.fs,
        fs_name: local_fs_type_name(partition.fs).to_string(),
        sector_start: partition.sector_start,
        sector_end: partition.sector_end,
        size_bytes,
        size_gib: size_bytes.map(to_gibibytes),
        size: size_bytes
            .map(|bytes| format_bytes(bytes, false))
            .unwrap_or_else(|| "-".to_string()),
        usage: partition.usage_text(),
        mount_point: partition.mount_point.clone(),
    }
}

impl fmt::Display for LayoutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({}, {})",
            self.name,
            self.device_path,
            self.table_type.as_str()
        )?;
        writeln!(
            f,
            "{:>3}  {:<20} {:<11} {:<9} {:<22} {:>12} {:>10}  {}",
            "#", "NAME", "TYPE", "STATUS", "FILESYSTEM", "SIZE", "USAGE", "MOUNT"
        )?;

        for row in &self.rows {
            writeln!(
                f,
                "{:>3}  {:<20} {:<11} {:<9} {:<22} {:>12} {:>10}  {}",
                row.index,
                row.name,
                format!("{:?}", row.r#type).to_lowercase(),
                format!("{:?}", row.status).to_lowercase(),
                row.fs_name,
                row.size,
                row.usage,
                row.mount_point.as_deref().unwrap_or("")
            )?;
        }

        writeln!(
            f,
            "primaries: {}  free primary slots: {}  extended: {}",
            self.primaries,
            self.primary_slots_available,
            self.extended_index
                .map(|index| index.to_string())
                .unwrap_or_else(|| "none".to_string())
        )?;

        for anomaly in &self.anomalies {
            let severity = if anomaly.is_blocking() { "error" } else { "note" };
            writeln!(f, "{severity}: {anomaly:?}")?;
        }

        Ok(())
    }
}
