// SPDX-License-Identifier: GPL-3.0-only

//! Sector/byte conversion and size helpers

use num_format::{Locale, ToFormattedString};

use crate::error::{PartmanError, Result};

pub const KIB: u64 = 1024;
pub const MIB: u64 = KIB * 1024;
pub const GIB: u64 = MIB * 1024;
pub const TIB: u64 = GIB * 1024;

/// Multiply a sector count by the sector size, refusing a zero sector size
/// or an overflowing result.
pub fn sectors_to_bytes(sectors: u64, sector_size: u64) -> Result<u64> {
    if sector_size == 0 {
        return Err(PartmanError::ZeroSectorSize);
    }

    sectors
        .checked_mul(sector_size)
        .ok_or(PartmanError::ByteLengthOverflow {
            sectors,
            sector_size,
        })
}

/// Number of whole sectors needed to hold `bytes`.
pub fn bytes_to_sectors(bytes: u64, sector_size: u64) -> Result<u64> {
    if sector_size == 0 {
        return Err(PartmanError::ZeroSectorSize);
    }
    Ok(bytes.div_ceil(sector_size))
}

/// Convert a byte count to gibibytes, rounding to the nearest integer with
/// ties going away from zero (exactly 1.5 GiB becomes 2).
pub fn to_gibibytes(bytes: u64) -> u64 {
    let whole = bytes / GIB;
    if bytes % GIB >= GIB / 2 {
        whole + 1
    } else {
        whole
    }
}

/// Used fraction of a filesystem: `(total - freespace) / total`.
///
/// Zero when `total` is zero, and clamped to `0.0..=1.0`.
pub fn usage_fraction(freespace: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }

    let used = total.saturating_sub(freespace);
    (used as f64 / total as f64).clamp(0.0, 1.0)
}

/// Convert bytes to a human-readable binary size (e.g., "1.50 GiB").
pub fn format_bytes(bytes: u64, add_bytes: bool) -> String {
    let mut steps = 0;
    let mut val: f64 = bytes as f64;

    while val >= 1024. && steps < 6 {
        val /= 1024.;
        steps += 1;
    }

    let unit = match steps {
        0 => "B",
        1 => "KiB",
        2 => "MiB",
        3 => "GiB",
        4 => "TiB",
        5 => "PiB",
        _ => "EiB",
    };

    if add_bytes {
        let bytes_str = bytes.to_formatted_string(&Locale::en);
        format!("{:.2} {} ({} bytes)", val, unit, bytes_str)
    } else {
        format!("{:.2} {}", val, unit)
    }
}

/// Parse a human-readable size to bytes (e.g., "1.5 GiB" or "512M").
pub fn parse_size(pretty: &str) -> Result<u64> {
    let pretty = pretty.trim();
    let split_at = pretty
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(pretty.len());
    let (number, unit) = pretty.split_at(split_at);

    let val: f64 = number
        .parse()
        .map_err(|_| PartmanError::InvalidRequest(format!("invalid size: '{pretty}'")))?;

    let multiplier = match unit.trim() {
        "" | "B" => 1,
        "K" | "KiB" | "KB" => KIB,
        "M" | "MiB" | "MB" => MIB,
        "G" | "GiB" | "GB" => GIB,
        "T" | "TiB" | "TB" => TIB,
        other => {
            return Err(PartmanError::InvalidRequest(format!(
                "invalid size unit: '{other}'"
            )));
        }
    };

    let bytes = val * multiplier as f64;
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(PartmanError::InvalidRequest(format!(
            "size out of range: '{pretty}'"
        )));
    }

    Ok(bytes as u64)
}
