//! Shared memory region management
//!
//! A [`Region`] is the shared memory object behind an ivshmem memory BAR:
//! negotiated with the other devices using the same name, mapped into this
//! process and installed into the guest physical address space.

use crate::config::validate_size;
use crate::shm::{Attach, SharedMemory};
use crate::{Error, Result};
use std::io;

/// Guest mapping permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    ReadOnly,
    ReadWrite,
}

/// Installs host memory into the guest physical address space
pub trait GuestMemoryMapper {
    /// Map `size` bytes at host virtual address `host_addr` to guest
    /// physical address `guest_base`.
    fn map_host_range(
        &mut self,
        guest_base: u64,
        size: u64,
        host_addr: u64,
        prot: Protection,
    ) -> io::Result<()>;
}

/// Role negotiated for the shared memory object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Created and sized the object
    Creator,
    /// Attached to an object created elsewhere
    Joiner,
}

/// Shared memory backing an ivshmem memory BAR
pub struct Region {
    shm: Option<SharedMemory>,
    name: String,
    size: u64,
    guest_base: u64,
    role: Role,
}

impl Region {
    /// Create or join `name`, map it and install it at `guest_base`
    ///
    /// Nothing is left behind on failure: the mapping and descriptor are
    /// dropped and an object this call created is unlinked again.
    pub fn acquire(
        name: &str,
        size: u64,
        guest_base: u64,
        mapper: &mut dyn GuestMemoryMapper,
    ) -> Result<Self> {
        validate_size(size)?;
        let len = usize::try_from(size).map_err(|_| Error::InvalidSize(size))?;

        let (mut shm, role) = match SharedMemory::create_or_join(name, len)? {
            Attach::Created(shm) => (shm, Role::Creator),
            Attach::Joined(shm) => (shm, Role::Joiner),
        };

        let host_addr = shm.as_mut_ptr() as u64;
        log::debug!(
            "shm configuration, vma {:#x}, ivshmem bar {:#x}, size {:#x}, {:?}",
            host_addr,
            guest_base,
            size,
            role
        );

        if let Err(e) = mapper.map_host_range(guest_base, size, host_addr, Protection::ReadWrite) {
            log::warn!("failed to map shared memory {}: {}", name, e);
            return Err(Error::GuestMap(e.to_string()));
        }

        Ok(Self {
            shm: Some(shm),
            name: name.to_string(),
            size,
            guest_base,
            role,
        })
    }

    /// Unmap and close the object, unlinking its name if we created it
    ///
    /// Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(shm) = self.shm.take() {
            log::debug!("releasing shm {} ({:?})", self.name, self.role);
            drop(shm);
        }
    }

    /// Get the shared memory name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Guest physical address the region was installed at
    pub fn guest_base(&self) -> u64 {
        self.guest_base
    }

    /// Negotiated role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether the mapping is still held
    pub fn is_mapped(&self) -> bool {
        self.shm.is_some()
    }

    /// Host view of the shared bytes, `None` once released
    pub fn as_slice(&self) -> Option<&[u8]> {
        self.shm.as_ref().map(SharedMemory::as_slice)
    }

    /// Mutable host view of the shared bytes, `None` once released
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        self.shm.as_mut().map(SharedMemory::as_mut_slice)
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.name)
            .field("size", &format_args!("{:#x}", self.size))
            .field("guest_base", &format_args!("{:#x}", self.guest_base))
            .field("role", &self.role)
            .field("mapped", &self.is_mapped())
            .finish()
    }
}
