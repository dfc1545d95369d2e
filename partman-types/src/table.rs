// SPDX-License-Identifier: GPL-3.0-only

//! Structural queries over an ordered partition list
//!
//! Every function takes the list in on-disk sector order and returns plain
//! indices or counts, so callers can keep results across redraws.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ErrorKind;
use crate::partition::{Partition, PartitionTableType, PartitionType};

/// Index of the extended partition, `None` if the disk has none.
///
/// A disk holds at most one extended partition. If the list carries more,
/// the first one is returned and the corruption is logged; use
/// [`validate_layout`] to surface it to the user.
pub fn find_extended_partition_index(partitions: &[Partition]) -> Option<usize> {
    let indices = extended_partition_indices(partitions);
    if indices.len() > 1 {
        warn!(
            ?indices,
            "partition list has more than one extended partition, using the first"
        );
    }
    indices.first().copied()
}

/// Indices of every record typed as extended.
pub fn extended_partition_indices(partitions: &[Partition]) -> Vec<usize> {
    partitions
        .iter()
        .enumerate()
        .filter(|(_, partition)| partition.kind == PartitionType::Extended)
        .map(|(index, _)| index)
        .collect()
}

/// Index of the first record equal to `partition` in every field.
pub fn find_partition_index(partitions: &[Partition], partition: &Partition) -> Option<usize> {
    partitions.iter().position(|candidate| candidate == partition)
}

/// Number of primary partitions, plus one for the extended partition if
/// present since it takes a primary table entry too.
pub fn count_primaries(partitions: &[Partition]) -> usize {
    let primaries = partitions
        .iter()
        .filter(|partition| partition.kind == PartitionType::Primary)
        .count();
    let has_extended = partitions
        .iter()
        .any(|partition| partition.kind == PartitionType::Extended);

    primaries + usize::from(has_extended)
}

/// Primary table entries still free on a disk with `table_type`.
pub fn primary_slots_available(partitions: &[Partition], table_type: PartitionTableType) -> usize {
    table_type
        .max_primary_partitions()
        .saturating_sub(count_primaries(partitions))
}

pub fn can_create_primary(partitions: &[Partition], table_type: PartitionTableType) -> bool {
    primary_slots_available(partitions, table_type) > 0
}

/// A logical partition needs an extended partition, or a free primary entry
/// to create one in.
pub fn can_create_logical(partitions: &[Partition], table_type: PartitionTableType) -> bool {
    table_type.supports_extended()
        && (find_extended_partition_index(partitions).is_some()
            || can_create_primary(partitions, table_type))
}

/// Index of the innermost record containing `sector`. Logical partitions and
/// free space inside the extended partition win over the extended container.
pub fn partition_index_at_sector(partitions: &[Partition], sector: u64) -> Option<usize> {
    let mut container = None;
    for (index, partition) in partitions.iter().enumerate() {
        if !partition.contains_sector(sector) {
            continue;
        }
        if partition.kind != PartitionType::Extended {
            return Some(index);
        }
        container.get_or_insert(index);
    }
    container
}

/// A structural problem found in a partition list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "anomaly", rename_all = "snake_case")]
pub enum LayoutAnomaly {
    InvalidGeometry {
        index: usize,
        sector_start: u64,
        sector_end: u64,
    },
    ZeroSectorSize {
        index: usize,
    },
    InvalidRecord {
        index: usize,
        reason: String,
    },
    MultipleExtended {
        indices: Vec<usize>,
    },
    LogicalOutsideExtended {
        index: usize,
    },
    OutOfOrder {
        index: usize,
        previous_start: u64,
    },
    TooManyPrimaries {
        count: usize,
        max: usize,
    },
}

impl LayoutAnomaly {
    /// Anomalies that make byte values computed from the list untrustworthy.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Self::OutOfOrder { .. })
    }
}

/// Check a partition list against the rules disk scanners must honor,
/// reporting every violation instead of stopping at the first.
pub fn validate_layout(partitions: &[Partition]) -> Vec<LayoutAnomaly> {
    let mut anomalies = Vec::new();

    for (index, partition) in partitions.iter().enumerate() {
        if partition.sector_end < partition.sector_start {
            anomalies.push(LayoutAnomaly::InvalidGeometry {
                index,
                sector_start: partition.sector_start,
                sector_end: partition.sector_end,
            });
        } else if let Err(error) = partition.validate()
            && error.kind() == ErrorKind::InvalidRecord
        {
            anomalies.push(LayoutAnomaly::InvalidRecord {
                index,
                reason: error.to_string(),
            });
        }

        if partition.sector_size == 0 {
            anomalies.push(LayoutAnomaly::ZeroSectorSize { index });
        }
    }

    let extended = extended_partition_indices(partitions);
    if extended.len() > 1 {
        anomalies.push(LayoutAnomaly::MultipleExtended {
            indices: extended.clone(),
        });
    }

    let container = extended.first().map(|&index| &partitions[index]);
    for (index, partition) in partitions.iter().enumerate() {
        if partition.kind != PartitionType::Logical {
            continue;
        }
        let inside = container.is_some_and(|extended| partition.is_within(extended));
        if !inside {
            anomalies.push(LayoutAnomaly::LogicalOutsideExtended { index });
        }
    }

    for (index, pair) in partitions.windows(2).enumerate() {
        if pair[1].sector_start < pair[0].sector_start {
            anomalies.push(LayoutAnomaly::OutOfOrder {
                index: index + 1,
                previous_start: pair[0].sector_start,
            });
        }
    }

    anomalies
}

/// [`validate_layout`] plus the rules of `table_type`: the primary slot
/// ceiling and the per-record checks of [`Partition::validate_for_table`].
pub fn validate_layout_for_table(
    partitions: &[Partition],
    table_type: PartitionTableType,
) -> Vec<LayoutAnomaly> {
    let mut anomalies = validate_layout(partitions);

    for (index, partition) in partitions.iter().enumerate() {
        // Plain record failures are already reported above.
        if partition.validate().is_err() {
            continue;
        }
        if let Err(error) = partition.validate_for_table(table_type) {
            anomalies.push(LayoutAnomaly::InvalidRecord {
                index,
                reason: error.to_string(),
            });
        }
    }

    let count = count_primaries(partitions);
    let max = table_type.max_primary_partitions();
    if count > max {
        anomalies.push(LayoutAnomaly::TooManyPrimaries { count, max });
    }

    anomalies
}

/// Type of partition the free record at `index` can take, `None` when it is
/// not free space or the table has no room.
///
/// Free space inside the extended partition only takes logical partitions;
/// anywhere else a primary partition needs a free slot.
pub fn new_partition_type_at(
    partitions: &[Partition],
    index: usize,
    table_type: PartitionTableType,
) -> Option<PartitionType> {
    let free = partitions.get(index).filter(|free| free.is_unallocated())?;

    let inside_extended = find_extended_partition_index(partitions)
        .is_some_and(|extended| free.is_within(&partitions[extended]));
    if inside_extended {
        return Some(PartitionType::Logical);
    }

    can_create_primary(partitions, table_type).then_some(PartitionType::Primary)
}
