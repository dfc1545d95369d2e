use partman_lab::errors::LabError;
use partman_lab::report::LayoutReport;
use partman_lab::spec;
use partman_types::{
    ErrorKind, FsType, GIB, LayoutAnomaly, MIB, NewPartitionRequest, Partition, PartitionSettings,
    PartitionStatus, PartitionTableType, PartitionType, can_create_logical, count_primaries,
    extended_partition_indices, find_extended_partition_index, find_partition_index,
    label_and_path, new_partition_type_at, partition_index_at_sector, plan_new_partition,
    primary_slots_available, replace_with_plan, supports_mount_point, validate_layout,
    validate_layout_for_table,
};

fn load(name: &str) -> (PartitionTableType, Vec<Partition>) {
    let layout = spec::load_by_name(name).unwrap();
    (layout.table_kind().unwrap(), layout.to_partitions().unwrap())
}

#[test]
fn mbr_mixed_scenario() {
    let (table_type, partitions) = load("mbr-mixed");
    assert_eq!(table_type, PartitionTableType::Msdos);
    assert_eq!(partitions.len(), 4);

    assert_eq!(count_primaries(&partitions), 2);
    assert_eq!(find_extended_partition_index(&partitions), Some(1));
    assert_eq!(partitions[3].kind, PartitionType::Unallocated);
    assert_eq!(partitions[3].byte_length().unwrap(), 4096 * 512);
    assert_eq!(partitions[0].byte_length().unwrap(), 2048 * 512);
    assert!(validate_layout(&partitions).is_empty());
}

#[test]
fn every_record_is_found_at_its_own_index() {
    for name in ["mbr-mixed", "gpt-basic", "double-extended", "mbr-full"] {
        let (_, partitions) = load(name);
        for (index, partition) in partitions.iter().enumerate() {
            assert_eq!(
                find_partition_index(&partitions, partition),
                Some(index),
                "{name} record {index}"
            );
        }
    }
}

#[test]
fn representative_sector_lies_inside_each_record() {
    for name in ["mbr-mixed", "gpt-basic"] {
        let (_, partitions) = load(name);
        for partition in &partitions {
            let sector = partition.representative_sector().unwrap();
            assert!(partition.contains_sector(sector));
        }
    }
}

#[test]
fn logical_wins_over_extended_at_a_shared_sector() {
    let (_, partitions) = load("mbr-mixed");
    assert_eq!(partition_index_at_sector(&partitions, 3000), Some(2));
    assert_eq!(partition_index_at_sector(&partitions, 100), Some(0));
    assert_eq!(partition_index_at_sector(&partitions, 9000), None);
}

#[test]
fn mbr_mixed_report() {
    let (table_type, partitions) = load("mbr-mixed");
    let report = LayoutReport::build("mbr-mixed", "/dev/sda", table_type, &partitions);

    assert_eq!(report.primaries, 2);
    assert_eq!(report.primary_slots_available, 2);
    assert_eq!(report.extended_index, Some(1));
    assert!(!report.has_blocking_anomalies());

    assert_eq!(report.rows[0].name, "root(sda1)");
    assert_eq!(report.rows[2].name, "sda5");
    assert_eq!(report.rows[2].fs_name, "Swap area");
    assert_eq!(report.rows[3].name, "Unallocated");
    assert_eq!(report.rows[3].size_bytes, Some(4096 * 512));
    assert_eq!(report.rows[3].size, "2.00 MiB");
    assert!(!supports_mount_point(partitions[2].fs));
}

#[test]
fn gpt_basic_queries() {
    let (table_type, partitions) = load("gpt-basic");
    assert_eq!(table_type, PartitionTableType::Gpt);

    assert_eq!(count_primaries(&partitions), 3);
    assert_eq!(find_extended_partition_index(&partitions), None);
    assert_eq!(primary_slots_available(&partitions, table_type), 125);
    assert!(!can_create_logical(&partitions, table_type));
    assert!(validate_layout(&partitions).is_empty());

    let root = &partitions[2];
    assert_eq!(root.fs, FsType::Ext4);
    assert_eq!(label_and_path(root), "rootfs(nvme0n1p2)");
    assert_eq!(root.byte_length().unwrap(), 40 * GIB);
    assert_eq!(root.usage_text(), "10/40G");
    assert_eq!(root.usage_fraction(), 0.25);
    assert!(supports_mount_point(root.fs));

    assert_eq!(partitions[1].byte_length().unwrap(), 512 * MIB);
    assert!(!supports_mount_point(partitions[1].fs));
    assert_eq!(partitions[3].fs, FsType::LinuxSwap);
}

#[test]
fn double_extended_is_reported_not_rejected() {
    let (_, partitions) = load("double-extended");

    assert_eq!(find_extended_partition_index(&partitions), Some(1));
    assert_eq!(extended_partition_indices(&partitions), vec![1, 3]);
    assert_eq!(count_primaries(&partitions), 2);

    let anomalies = validate_layout(&partitions);
    assert!(anomalies.contains(&LayoutAnomaly::MultipleExtended {
        indices: vec![1, 3]
    }));
    assert!(anomalies.contains(&LayoutAnomaly::LogicalOutsideExtended { index: 4 }));
    assert!(!anomalies.contains(&LayoutAnomaly::LogicalOutsideExtended { index: 2 }));
    assert!(anomalies.iter().any(LayoutAnomaly::is_blocking));
}

#[test]
fn staging_a_primary_in_mbr_free_space() {
    let (table_type, partitions) = load("mbr-mixed");
    let request = NewPartitionRequest::new(PartitionType::Primary, FsType::Ext4, MIB)
        .mount_point("/home")
        .aligned_to(2048);

    let planned = plan_new_partition(&partitions, 3, &request, table_type).unwrap();
    assert_eq!(planned.status, PartitionStatus::New);
    assert_eq!(planned.sector_start, 4096);
    assert_eq!(planned.sector_end, 6143);
    assert_eq!(planned.sectors_unallocated_preceding, None);
    assert_eq!(planned.sectors_unallocated_succeeding, Some(2048));

    let staged = replace_with_plan(&partitions, 3, &planned, table_type).unwrap();
    assert_eq!(staged.len(), 5);
    assert_eq!(staged[3].mount_point.as_deref(), Some("/home"));
    assert_eq!(staged[4].kind, PartitionType::Unallocated);
    assert_eq!((staged[4].sector_start, staged[4].sector_end), (6144, 8191));
    assert_eq!(count_primaries(&staged), 3);
    assert!(validate_layout(&staged).is_empty());
}

#[test]
fn staging_in_gpt_free_space_uses_settings() {
    let (table_type, partitions) = load("gpt-basic");
    let settings = PartitionSettings {
        table_type,
        ..PartitionSettings::default()
    };

    let kind = settings.preferred_new_partition_type(&partitions).unwrap();
    assert_eq!(kind, PartitionType::Primary);

    let request = NewPartitionRequest::new(kind, settings.default_fs, 10 * GIB)
        .aligned_to(settings.alignment_sectors);
    let planned = plan_new_partition(&partitions, 4, &request, table_type).unwrap();
    assert_eq!(planned.sector_start, 93325312);
    assert_eq!(planned.byte_length().unwrap(), 10 * GIB);

    let staged = replace_with_plan(&partitions, 4, &planned, table_type).unwrap();
    assert_eq!(staged.len(), 6);
    assert_eq!(staged[5].sector_end, 134217694);
    assert!(validate_layout(&staged).is_empty());
}

#[test]
fn planning_into_a_partition_fails() {
    let (table_type, partitions) = load("mbr-mixed");
    let request = NewPartitionRequest::new(PartitionType::Primary, FsType::Ext4, MIB);
    let error = plan_new_partition(&partitions, 0, &request, table_type).unwrap_err();
    assert!(!error.is_invalid_geometry());
}

#[test]
fn full_mbr_table_refuses_a_fifth_primary() {
    let (table_type, partitions) = load("mbr-full");
    assert_eq!(count_primaries(&partitions), 4);
    assert!(validate_layout_for_table(&partitions, table_type).is_empty());
    assert_eq!(new_partition_type_at(&partitions, 4, table_type), None);

    for kind in [PartitionType::Primary, PartitionType::Extended] {
        let fs = if kind == PartitionType::Extended {
            FsType::Empty
        } else {
            FsType::Ext4
        };
        let request = NewPartitionRequest::new(kind, fs, MIB).aligned_to(2048);
        let error = plan_new_partition(&partitions, 4, &request, table_type).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput, "{kind:?}");
    }
}

#[test]
fn full_mbr_table_refuses_a_logical_without_extended() {
    let (table_type, partitions) = load("mbr-full");
    let request = NewPartitionRequest::new(PartitionType::Logical, FsType::Ext4, MIB);
    let error = plan_new_partition(&partitions, 4, &request, table_type).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidInput);
}

#[test]
fn mbr_mixed_refuses_a_second_extended() {
    let (table_type, partitions) = load("mbr-mixed");
    let request = NewPartitionRequest::new(PartitionType::Extended, FsType::Empty, MIB);
    let error = plan_new_partition(&partitions, 3, &request, table_type).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidInput);
    assert_eq!(extended_partition_indices(&partitions), vec![1]);
}

#[test]
fn free_space_type_follows_the_table() {
    let (table_type, partitions) = load("mbr-mixed");
    assert_eq!(
        new_partition_type_at(&partitions, 3, table_type),
        Some(PartitionType::Primary)
    );

    let (table_type, partitions) = load("gpt-basic");
    assert_eq!(
        new_partition_type_at(&partitions, 4, table_type),
        Some(PartitionType::Primary)
    );
}

#[test]
fn fixtures_respect_their_table_rules() {
    for name in ["mbr-mixed", "gpt-basic", "mbr-full"] {
        let (table_type, partitions) = load(name);
        assert!(
            validate_layout_for_table(&partitions, table_type).is_empty(),
            "{name}"
        );
    }
}

#[test]
fn settings_fixture_matches_defaults() {
    let raw = std::fs::read_to_string(spec::workspace_root().join("resources/settings/default.toml"))
        .unwrap();
    let settings = PartitionSettings::from_toml_str(&raw).unwrap();
    assert_eq!(settings, PartitionSettings::default());
}

#[test]
fn unknown_fixture_is_not_found() {
    assert!(matches!(
        spec::load_by_name("no-such-layout"),
        Err(LabError::SpecNotFound { .. })
    ));
}

#[test]
fn fixture_loads_by_path() {
    let path = spec::spec_path_for_name("gpt-basic");
    let layout = spec::load(path.to_str().unwrap()).unwrap();
    assert_eq!(layout.device_path, "/dev/nvme0n1");
}
