// SPDX-License-Identifier: GPL-3.0-only

//! Staging new partitions inside unallocated space
//!
//! Planning never touches the caller's list: it returns fresh records (or a
//! fresh list) that the controller swaps in.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PartmanError, Result};
use crate::filesystem::{FsType, OsType};
use crate::partition::{Partition, PartitionStatus, PartitionTableType, PartitionType};
use crate::table;
use crate::units;

/// Where the new partition sits inside the free space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Start,
    End,
}

/// A partition the user asked to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPartitionRequest {
    pub kind: PartitionType,
    pub fs: FsType,
    pub mount_point: Option<String>,
    pub part_label: Option<String>,
    /// Requested size; rounded up to whole sectors and capped at the free span
    pub size_bytes: u64,
    pub placement: Placement,
    /// Start sector is rounded up to a multiple of this; 1 disables alignment
    pub alignment_sectors: u64,
}

impl NewPartitionRequest {
    pub fn new(kind: PartitionType, fs: FsType, size_bytes: u64) -> Self {
        Self {
            kind,
            fs,
            mount_point: None,
            part_label: None,
            size_bytes,
            placement: Placement::Start,
            alignment_sectors: 1,
        }
    }

    pub fn mount_point(mut self, mount_point: impl Into<String>) -> Self {
        self.mount_point = Some(mount_point.into());
        self
    }

    pub fn part_label(mut self, part_label: impl Into<String>) -> Self {
        self.part_label = Some(part_label.into());
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn aligned_to(mut self, alignment_sectors: u64) -> Self {
        self.alignment_sectors = alignment_sectors;
        self
    }

    fn check(&self, table_type: PartitionTableType) -> Result<()> {
        if self.size_bytes == 0 {
            return Err(PartmanError::InvalidRequest(
                "partition size must be greater than zero".to_string(),
            ));
        }

        if self.alignment_sectors == 0 {
            return Err(PartmanError::InvalidRequest(
                "alignment must be at least one sector".to_string(),
            ));
        }

        match self.kind {
            PartitionType::Unallocated => {
                return Err(PartmanError::InvalidRequest(
                    "cannot stage unallocated space as a partition".to_string(),
                ));
            }
            PartitionType::Extended if self.fs != FsType::Empty || self.mount_point.is_some() => {
                return Err(PartmanError::InvalidRequest(
                    "an extended partition cannot hold a filesystem".to_string(),
                ));
            }
            PartitionType::Extended | PartitionType::Logical if !table_type.supports_extended() => {
                return Err(PartmanError::InvalidRequest(format!(
                    "{} tables have no extended or logical partitions",
                    table_type.as_str()
                )));
            }
            _ => {}
        }

        if self.mount_point.is_some() && !self.fs.supports_mount_point() {
            return Err(PartmanError::InvalidRequest(format!(
                "filesystem '{}' cannot have a mount point",
                self.fs
            )));
        }

        if self.part_label.is_some() && !table_type.supports_part_label() {
            return Err(PartmanError::InvalidRequest(format!(
                "{} tables do not support partition labels",
                table_type.as_str()
            )));
        }

        Ok(())
    }
}

fn align_up(value: u64, alignment: u64) -> Result<u64> {
    value
        .div_ceil(alignment)
        .checked_mul(alignment)
        .ok_or_else(|| PartmanError::InvalidRequest(format!("sector {value} cannot be aligned")))
}

fn align_down(value: u64, alignment: u64) -> u64 {
    value / alignment * alignment
}

/// Fails unless a `kind` partition may be created in `free` on a disk laid
/// out as `partitions`: primary and extended records need a free primary
/// slot and must sit outside the extended partition, a disk gets at most one
/// extended partition, and logical records live inside it.
fn check_table_room(
    partitions: &[Partition],
    free: &Partition,
    kind: PartitionType,
    table_type: PartitionTableType,
) -> Result<()> {
    let extended =
        table::find_extended_partition_index(partitions).map(|index| &partitions[index]);
    let inside_extended = extended.is_some_and(|extended| free.is_within(extended));

    match kind {
        PartitionType::Logical if !inside_extended => Err(PartmanError::InvalidRequest(format!(
            "free space {}..={} is outside the extended partition",
            free.sector_start, free.sector_end
        ))),
        PartitionType::Primary | PartitionType::Extended if inside_extended => {
            Err(PartmanError::InvalidRequest(format!(
                "free space {}..={} is inside the extended partition, only logical partitions fit",
                free.sector_start, free.sector_end
            )))
        }
        PartitionType::Extended if extended.is_some() => Err(PartmanError::InvalidRequest(
            "the disk already has an extended partition".to_string(),
        )),
        PartitionType::Primary | PartitionType::Extended
            if !table::can_create_primary(partitions, table_type) =>
        {
            Err(PartmanError::InvalidRequest(format!(
                "all {} primary slots of the {} table are in use",
                table_type.max_primary_partitions(),
                table_type.as_str()
            )))
        }
        _ => Ok(()),
    }
}

/// Stage `request` inside the unallocated record at `index`.
///
/// The returned record has status [`PartitionStatus::New`] and records the
/// leftover free sectors on either side in `sectors_unallocated_*`. The
/// request must fit the table: see [`table::can_create_primary`] and the
/// extended partition rules.
pub fn plan_new_partition(
    partitions: &[Partition],
    index: usize,
    request: &NewPartitionRequest,
    table_type: PartitionTableType,
) -> Result<Partition> {
    let free = partitions
        .get(index)
        .ok_or(PartmanError::IndexOutOfRange {
            index,
            len: partitions.len(),
        })?;

    if !free.is_unallocated() {
        return Err(PartmanError::NotUnallocated {
            sector_start: free.sector_start,
            sector_end: free.sector_end,
        });
    }
    free.sector_length()?;
    request.check(table_type)?;
    check_table_room(partitions, free, request.kind, table_type)?;

    let first = align_up(free.sector_start, request.alignment_sectors)?;
    if first > free.sector_end {
        return Err(PartmanError::InvalidRequest(format!(
            "no sector aligned to {} in {}..={}",
            request.alignment_sectors, free.sector_start, free.sector_end
        )));
    }

    let room = free.sector_end - first + 1;
    let wanted = units::bytes_to_sectors(request.size_bytes, free.sector_size)?;
    let sectors = wanted.min(room);

    let sector_start = match request.placement {
        Placement::Start => first,
        Placement::End => {
            align_down(free.sector_end - sectors + 1, request.alignment_sectors).max(first)
        }
    };
    let sector_end = sector_start + sectors - 1;

    let preceding = sector_start - free.sector_start;
    let succeeding = free.sector_end - sector_end;

    debug!(
        device = %free.device_path,
        sector_start,
        sector_end,
        preceding,
        succeeding,
        capped = (wanted > room),
        "planned new partition"
    );

    Ok(Partition {
        device_path: free.device_path.clone(),
        path: String::new(),
        uuid: None,
        label: None,
        part_label: request.part_label.clone(),
        partition_number: None,
        kind: request.kind,
        status: PartitionStatus::New,
        fs: request.fs,
        os: OsType::Empty,
        sector_size: free.sector_size,
        length: None,
        freespace: None,
        sector_start,
        sector_end,
        sectors_unallocated_preceding: (preceding > 0).then_some(preceding),
        sectors_unallocated_succeeding: (succeeding > 0).then_some(succeeding),
        mount_point: request.mount_point.clone(),
    })
}

/// Unallocated records for the leftover space a planned record describes,
/// preceding space first.
pub fn materialize_unallocated(planned: &Partition) -> Result<Vec<Partition>> {
    let mut free = Vec::new();

    if let Some(preceding) = planned.sectors_unallocated_preceding.filter(|&n| n > 0) {
        let start = planned.sector_start.checked_sub(preceding).ok_or_else(|| {
            PartmanError::invalid_record(format!(
                "{preceding} unallocated sectors precede sector {}",
                planned.sector_start
            ))
        })?;
        free.push(Partition::unallocated(
            planned.device_path.clone(),
            start,
            planned.sector_start - 1,
            planned.sector_size,
        )?);
    }

    if let Some(succeeding) = planned.sectors_unallocated_succeeding.filter(|&n| n > 0) {
        let end = planned.sector_end.checked_add(succeeding).ok_or_else(|| {
            PartmanError::invalid_record(format!(
                "{succeeding} unallocated sectors follow sector {}",
                planned.sector_end
            ))
        })?;
        free.push(Partition::unallocated(
            planned.device_path.clone(),
            planned.sector_end + 1,
            end,
            planned.sector_size,
        )?);
    }

    Ok(free)
}

/// New list where the unallocated record at `index` is split into the
/// planned record and its leftover free space.
///
/// The inserted copy of `planned` has its `sectors_unallocated_*` fields
/// cleared since the leftover records now exist. `planned` is held to the
/// same table rules as [`plan_new_partition`].
pub fn replace_with_plan(
    partitions: &[Partition],
    index: usize,
    planned: &Partition,
    table_type: PartitionTableType,
) -> Result<Vec<Partition>> {
    let free = partitions
        .get(index)
        .ok_or(PartmanError::IndexOutOfRange {
            index,
            len: partitions.len(),
        })?;

    if !free.is_unallocated() {
        return Err(PartmanError::NotUnallocated {
            sector_start: free.sector_start,
            sector_end: free.sector_end,
        });
    }

    if !planned.is_within(free) {
        return Err(PartmanError::InvalidRequest(format!(
            "planned sectors {}..={} fall outside free space {}..={}",
            planned.sector_start, planned.sector_end, free.sector_start, free.sector_end
        )));
    }

    check_table_room(partitions, free, planned.kind, table_type)?;

    let leftover = materialize_unallocated(planned)?;
    let mut staged = planned.clone();
    staged.sectors_unallocated_preceding = None;
    staged.sectors_unallocated_succeeding = None;

    let mut result = Vec::with_capacity(partitions.len() + leftover.len());
    result.extend_from_slice(&partitions[..index]);
    result.extend(
        leftover
            .iter()
            .filter(|gap| gap.sector_end < staged.sector_start)
            .cloned(),
    );
    result.push(staged.clone());
    result.extend(
        leftover
            .into_iter()
            .filter(|gap| gap.sector_start > staged.sector_end),
    );
    result.extend_from_slice(&partitions[index + 1..]);

    Ok(result)
}

/// Fresh record asking for `partition` to be formatted with `fs`.
///
/// Filesystem identity (uuid, label, usage, detected OS) is dropped since
/// formatting replaces it.
pub fn plan_reformat(
    partition: &Partition,
    fs: FsType,
    mount_point: Option<String>,
) -> Result<Partition> {
    if !matches!(
        partition.kind,
        PartitionType::Primary | PartitionType::Logical
    ) {
        return Err(PartmanError::InvalidRequest(format!(
            "cannot format a {:?} record",
            partition.kind
        )));
    }

    if !fs.is_formatted() || fs == FsType::Others {
        return Err(PartmanError::InvalidRequest(format!(
            "'{fs}' is not a filesystem that can be created"
        )));
    }

    if mount_point.is_some() && !fs.supports_mount_point() {
        return Err(PartmanError::InvalidRequest(format!(
            "filesystem '{fs}' cannot have a mount point"
        )));
    }

    partition.sector_length()?;

    Ok(Partition {
        uuid: None,
        label: None,
        status: PartitionStatus::Formatted,
        fs,
        os: OsType::Empty,
        length: None,
        freespace: None,
        mount_point,
        ..partition.clone()
    })
}
