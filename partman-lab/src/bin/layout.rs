use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use partman_lab::errors::LabError;
use partman_lab::logging::{self, LogLevel};
use partman_lab::report::{LayoutReport, disk_bytes};
use partman_lab::spec;
use partman_types::{
    FsType, NewPartitionRequest, PartitionSettings, PartitionType, Placement,
    new_partition_type_at, parse_size, plan_new_partition, replace_with_plan,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "layout")]
#[command(about = "Inspect disk layout fixtures and stage partitions in them")]
struct LayoutCli {
    /// Verbosity when RUST_LOG is unset
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// Partitioning settings (TOML); built-in defaults otherwise
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: LayoutCommand,
}

#[derive(Debug, Subcommand)]
enum LayoutCommand {
    /// Print the partition list with sizes, usage and table summary
    Report {
        spec: String,
        #[arg(long)]
        json: bool,
    },
    /// Fail when the layout has structural problems
    Check { spec: String },
    /// Stage a new partition in the unallocated record at INDEX
    Plan {
        spec: String,
        #[arg(long)]
        index: usize,
        /// Size such as "20G", "512MiB" or "1048576"
        #[arg(long)]
        size: String,
        #[arg(long, value_enum)]
        r#type: Option<NewKind>,
        #[arg(long)]
        fs: Option<String>,
        #[arg(long)]
        mount: Option<String>,
        #[arg(long)]
        label: Option<String>,
        /// Place the partition at the end of the free space
        #[arg(long)]
        end: bool,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NewKind {
    Primary,
    Logical,
    Extended,
}

impl From<NewKind> for PartitionType {
    fn from(kind: NewKind) -> Self {
        match kind {
            NewKind::Primary => PartitionType::Primary,
            NewKind::Logical => PartitionType::Logical,
            NewKind::Extended => PartitionType::Extended,
        }
    }
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<PartitionSettings> {
    let Some(path) = path else {
        return Ok(PartitionSettings::default());
    };

    let raw = fs::read_to_string(path).map_err(|error| LabError::Settings {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;

    let settings = PartitionSettings::from_toml_str(&raw).map_err(|error| LabError::Settings {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;

    Ok(settings)
}

fn print_report(report: &LayoutReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = LayoutCli::parse();
    logging::init(cli.log_level, cli.log_file.as_deref())?;
    let settings = load_settings(cli.settings.as_deref())?;

    match cli.command {
        LayoutCommand::Report { spec, json } => {
            let layout = spec::load(&spec)?;
            let partitions = layout.to_partitions()?;
            let report = LayoutReport::build(
                &layout.name,
                &layout.device_path,
                layout.table_kind()?,
                &partitions,
            );
            print_report(&report, json)
        }
        LayoutCommand::Check { spec } => {
            let layout = spec::load(&spec)?;
            let partitions = layout.to_partitions()?;
            let report = LayoutReport::build(
                &layout.name,
                &layout.device_path,
                layout.table_kind()?,
                &partitions,
            );

            for anomaly in &report.anomalies {
                println!("{}", serde_json::to_string(anomaly)?);
            }

            if report.has_blocking_anomalies() {
                bail!("layout '{}' has structural problems", layout.name);
            }

            let disk_size = disk_bytes(&partitions)?;
            if !settings.meets_minimum(disk_size) {
                println!(
                    "note: smaller than the {} GiB installation minimum",
                    settings.minimum_disk_space_gib
                );
            } else if !settings.meets_recommended(disk_size) {
                println!(
                    "note: smaller than the recommended {} GiB",
                    settings.recommended_disk_space_gib
                );
            }

            println!("{}: ok", layout.name);
            Ok(())
        }
        LayoutCommand::Plan {
            spec,
            index,
            size,
            r#type,
            fs,
            mount,
            label,
            end,
            json,
        } => {
            let layout = spec::load(&spec)?;
            let table_type = layout.table_kind()?;
            let partitions = layout.to_partitions()?;

            if index >= partitions.len() {
                bail!("'{}' has no record at index {index}", layout.name);
            }

            let kind = match r#type {
                Some(kind) => kind.into(),
                None => new_partition_type_at(&partitions, index, table_type).with_context(|| {
                    format!("record {index} of '{}' cannot take a new partition", layout.name)
                })?,
            };
            let fs = match (kind, fs) {
                (PartitionType::Extended, _) => FsType::Empty,
                (_, Some(name)) => FsType::parse(&name),
                (_, None) => settings.default_fs,
            };

            let mut request = NewPartitionRequest::new(kind, fs, parse_size(&size)?)
                .aligned_to(settings.alignment_sectors);
            if let Some(mount) = mount {
                request = request.mount_point(mount);
            }
            if let Some(label) = label {
                request = request.part_label(label);
            }
            if end {
                request = request.placement(Placement::End);
            }

            let planned = plan_new_partition(&partitions, index, &request, table_type)?;
            info!(
                spec = %layout.name,
                index,
                sector_start = planned.sector_start,
                sector_end = planned.sector_end,
                "staged partition"
            );

            let staged = replace_with_plan(&partitions, index, &planned, table_type)?;
            let report = LayoutReport::build(&layout.name, &layout.device_path, table_type, &staged);
            print_report(&report, json)
        }
    }
}
