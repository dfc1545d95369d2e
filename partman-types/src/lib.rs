// SPDX-License-Identifier: GPL-3.0-only

//! Partition layout model for the installer partitioner
//!
//! This crate holds the in-memory model of a disk's partition layout and the
//! pure computations performed over it. It never talks to a disk: the disk
//! scanner builds the ordered list of [`Partition`] records, and the
//! partitioning UI queries it.
//!
//! - [`partition`]: the record itself and its derived geometry
//! - [`table`]: structural queries over an ordered list of records
//! - [`units`] and [`display`]: byte/sector/GiB conversion and usage text
//! - [`settings`]: installer policy, passed in explicitly
//! - [`planning`]: staging new partitions inside unallocated space
//!
//! Every function is synchronous and side-effect free apart from `tracing`
//! events; the list must not change while a query runs over it.

pub mod display;
pub mod error;
pub mod filesystem;
pub mod partition;
pub mod planning;
pub mod settings;
pub mod table;
pub mod units;

pub use display::{
    label_and_path, local_fs_type_name, partition_name, supports_mount_point, usage_text,
};
pub use error::{ErrorKind, PartmanError, Result};
pub use filesystem::{FsType, OsType};
pub use partition::{Partition, PartitionStatus, PartitionTableType, PartitionType};
pub use planning::{
    NewPartitionRequest, Placement, materialize_unallocated, plan_new_partition, plan_reformat,
    replace_with_plan,
};
pub use settings::PartitionSettings;
pub use table::{
    LayoutAnomaly, can_create_logical, can_create_primary, count_primaries,
    extended_partition_indices, find_extended_partition_index, find_partition_index,
    new_partition_type_at, partition_index_at_sector, primary_slots_available, validate_layout,
    validate_layout_for_table,
};
pub use units::{GIB, KIB, MIB, TIB, format_bytes, parse_size, to_gibibytes, usage_fraction};
