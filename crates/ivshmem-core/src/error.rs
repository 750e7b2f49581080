//! Error types for ivshmem

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid device options: {0}")]
    InvalidConfig(String),

    #[error("invalid shared memory size {0}, the size range is [4K,128M] bytes and value must be a power of 2")]
    InvalidSize(u64),

    #[error("shared memory error: {0}")]
    SharedMemory(String),

    #[error("shm size is different: requested {expected}, creator {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("failed to map shared memory into guest: {0}")]
    GuestMap(String),

    #[error("pci error: {0}")]
    Pci(String),

    #[error("device already attached to shared memory {0}")]
    AlreadyAttached(String),
}

pub type Result<T> = std::result::Result<T, Error>;
