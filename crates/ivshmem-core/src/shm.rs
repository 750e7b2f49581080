//! POSIX shared memory wrapper

use crate::{Error, Result};
use shared_memory::{Shmem, ShmemConf, ShmemError};
use std::io;

/// A mapped shared memory object
///
/// Dropping it unmaps the object and closes its descriptor. The side that
/// created the object also unlinks its name; the storage itself lives on
/// until every process holding a mapping lets go of it.
pub struct SharedMemory {
    inner: Shmem,
    name: String,
    size: usize,
    creator: bool,
}

/// Outcome of [`SharedMemory::create_or_join`]
pub enum Attach {
    /// The object did not exist and was created and sized by this call
    Created(SharedMemory),
    /// The object already existed and has the requested size
    Joined(SharedMemory),
}

impl Attach {
    /// Whether this side created the object
    pub fn is_creator(&self) -> bool {
        matches!(self, Attach::Created(_))
    }

    /// Unwrap the mapping regardless of role
    pub fn into_inner(self) -> SharedMemory {
        match self {
            Attach::Created(shm) | Attach::Joined(shm) => shm,
        }
    }
}

impl SharedMemory {
    /// Exclusively create `name` with `size` bytes, or join the existing
    /// object of that name if it already has exactly `size` bytes.
    ///
    /// There is a short window between another creator's exclusive create
    /// and its resize where a joiner sees an empty object. That joiner fails
    /// with a size mismatch against zero bytes.
    pub fn create_or_join(name: &str, size: usize) -> Result<Attach> {
        if let Some(shm) = Self::create(name, size)? {
            return Ok(Attach::Created(shm));
        }

        let shm = match Self::open(name)? {
            Some(shm) => shm,
            None => {
                log::warn!("shm size is different, cur {}, creator 0", size);
                return Err(Error::SizeMismatch {
                    expected: size,
                    actual: 0,
                });
            }
        };
        if shm.size != size {
            log::warn!("shm size is different, cur {}, creator {}", size, shm.size);
            return Err(Error::SizeMismatch {
                expected: size,
                actual: shm.size,
            });
        }
        Ok(Attach::Joined(shm))
    }

    /// Create a new shared memory object, `None` if the name is taken
    fn create(name: &str, size: usize) -> Result<Option<Self>> {
        let shmem = match ShmemConf::new().size(size).os_id(name).create() {
            Ok(shmem) => shmem,
            Err(ShmemError::MappingIdExists) => return Ok(None),
            Err(e) => {
                log::warn!("failed to create shared memory {}: {}", name, e);
                return Err(Error::SharedMemory(e.to_string()));
            }
        };

        Ok(Some(Self {
            inner: shmem,
            name: name.to_string(),
            size,
            creator: true,
        }))
    }

    /// Open an existing shared memory object, `None` if it is still empty
    fn open(name: &str) -> Result<Option<Self>> {
        let shmem = match ShmemConf::new().os_id(name).open() {
            Ok(shmem) => shmem,
            // The name was just seen to exist, so EINVAL comes from mapping
            // an object whose creator has not sized it yet.
            Err(ShmemError::MapOpenFailed(errno))
                if io::Error::from_raw_os_error(errno as i32).kind()
                    == io::ErrorKind::InvalidInput =>
            {
                return Ok(None);
            }
            Err(e) => {
                log::warn!("failed to get {} status, error {}", name, e);
                return Err(Error::SharedMemory(e.to_string()));
            }
        };

        let size = shmem.len();

        Ok(Some(Self {
            inner: shmem,
            name: name.to_string(),
            size,
            creator: false,
        }))
    }

    /// Get the name of the shared memory object
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the mapped size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether this mapping created the object
    pub fn is_creator(&self) -> bool {
        self.creator
    }

    /// Get a raw pointer to the mapping
    pub fn as_ptr(&self) -> *const u8 {
        self.inner.as_ptr()
    }

    /// Get a mutable raw pointer to the mapping
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.inner.as_ptr()
    }

    /// Get a slice view of the mapping
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.size) }
    }

    /// Get a mutable slice view of the mapping
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.as_mut_ptr(), self.size) }
    }
}
