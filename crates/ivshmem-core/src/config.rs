//! Device option parsing
//!
//! An ivshmem device is instantiated with `shm_name,shm_size`, e.g.
//! `vm_shm,2M`. The size accepts an optional `K`/`M`/`G` multiplier
//! (powers of 1024) and a trailing `B`.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Smallest shared memory segment a device accepts
pub const MIN_SHM_SIZE: u64 = 4096;

/// Largest shared memory segment a device accepts
pub const MAX_SHM_SIZE: u64 = 128 * 1024 * 1024;

/// Parsed device options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IvshmemConfig {
    /// Name of the POSIX shared memory object
    pub name: String,
    /// Segment size in bytes
    pub size: u64,
}

impl IvshmemConfig {
    /// Build a config, validating the size
    pub fn new(name: &str, size: u64) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidConfig("the shared memory name is not set".to_string()));
        }
        validate_size(size)?;
        Ok(Self {
            name: name.to_string(),
            size,
        })
    }
}

impl FromStr for IvshmemConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, size) = s
            .split_once(',')
            .ok_or_else(|| Error::InvalidConfig("the shared memory size is not set".to_string()))?;
        let size = parse_size(size.trim())?;
        Self::new(name.trim(), size)
    }
}

impl fmt::Display for IvshmemConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.name, self.size)
    }
}

/// Check the size is a power of two within [`MIN_SHM_SIZE`, `MAX_SHM_SIZE`]
pub fn validate_size(size: u64) -> Result<()> {
    if !(MIN_SHM_SIZE..=MAX_SHM_SIZE).contains(&size) || !size.is_power_of_two() {
        return Err(Error::InvalidSize(size));
    }
    Ok(())
}

/// Parse a decimal byte count with an optional `K`, `M` or `G` suffix
pub fn parse_size(s: &str) -> Result<u64> {
    let invalid = || Error::InvalidConfig(format!("the shared memory size is incorrect, {s}"));

    let mut digits = s.strip_suffix('B').unwrap_or(s);
    let multiplier: u64 = match digits.chars().last() {
        Some('K') | Some('k') => 1 << 10,
        Some('M') | Some('m') => 1 << 20,
        Some('G') | Some('g') => 1 << 30,
        _ => 1,
    };
    if multiplier != 1 {
        digits = &digits[..digits.len() - 1];
    }
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let n: u64 = digits.parse().map_err(|_| invalid())?;
    n.checked_mul(multiplier).ok_or_else(invalid)
}
