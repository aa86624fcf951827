//! Byte, megabyte, gigabyte, and sector conversions

use crate::utils::error::{Result, VolstrapError};

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Sector size assumed for all sfdisk arithmetic.
pub const SECTOR_SIZE: u64 = 512;

pub fn meg_to_byte(mb: f64) -> u64 {
    (mb * MIB) as u64
}

pub fn gig_to_byte(gb: f64) -> u64 {
    (gb * GIB) as u64
}

pub fn byte_to_sector(bytes: u64) -> u64 {
    bytes / SECTOR_SIZE
}

/// Convert bytes to GB truncated to two decimal places.
///
/// Display only. Truncation loses precision, so never feed the result back
/// into size arithmetic.
pub fn byte_to_gig_trunc(bytes: u64) -> f64 {
    let gb = bytes as f64 / GIB;
    (gb * 100.0).floor() / 100.0
}

/// Parse a user-supplied size string like `512M` or `10G` into bytes.
///
/// The suffix is accepted in either case. Anything without a valid suffix
/// or a parseable positive number is rejected.
pub fn parse_size_input(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let invalid = || VolstrapError::InvalidSizeFormat(input.to_string());

    if trimmed.len() < 2 {
        return Err(invalid());
    }

    let (number, suffix) = trimmed.split_at(trimmed.len() - 1);
    let value: f64 = number.parse().map_err(|_| invalid())?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid());
    }

    match suffix {
        "M" | "m" => Ok(meg_to_byte(value)),
        "G" | "g" => Ok(gig_to_byte(value)),
        _ => Err(invalid()),
    }
}
