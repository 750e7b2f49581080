//! ivshmem - Inter-VM shared memory PCI device
//!
//! Exposes a named POSIX shared memory object to a guest as a PCI memory
//! BAR. Every VM whose device uses the same name sees the same bytes.

pub mod config;
pub mod device;
pub mod error;
pub mod pci;
pub mod region;
pub mod regs;
pub mod shm;

pub use config::{IvshmemConfig, MAX_SHM_SIZE, MIN_SHM_SIZE};
pub use device::{IvshmemDevice, PciDevice};
pub use error::{Error, Result};
pub use pci::{BarKind, HardwareIds, PciFramework};
pub use region::{GuestMemoryMapper, Protection, Region, Role};
pub use regs::{Doorbell, RegisterFile, REG_SIZE};
