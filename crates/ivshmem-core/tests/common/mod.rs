//! Stand-ins for the VMM's PCI emulation and guest memory map

#![allow(dead_code)]

use ivshmem_core::pci::cfg_space;
use ivshmem_core::{BarKind, Error, GuestMemoryMapper, PciFramework, Protection, Result};
use std::io;

/// A BAR handed out by [`FakePci`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    pub index: u8,
    pub kind: BarKind,
    pub size: u64,
    pub addr: u64,
}

/// Minimal PCI emulation: a 64-byte config header and bump allocators
/// for 32-bit and 64-bit BAR windows.
pub struct FakePci {
    pub cfg: [u8; 0x40],
    pub bars: Vec<Bar>,
    /// BAR index whose allocation is refused
    pub fail_bar: Option<u8>,
    next_mmio32: u64,
    next_mmio64: u64,
}

impl FakePci {
    pub fn new() -> Self {
        Self::with_windows(0xc000_0000, 0x40_0000_0000)
    }

    pub fn with_windows(mmio32: u64, mmio64: u64) -> Self {
        Self {
            cfg: [0; 0x40],
            bars: Vec::new(),
            fail_bar: None,
            next_mmio32: mmio32,
            next_mmio64: mmio64,
        }
    }

    pub fn bar(&self, index: u8) -> Option<Bar> {
        self.bars.iter().copied().find(|b| b.index == index)
    }

    /// Whether the device touched config space at all
    pub fn is_pristine(&self) -> bool {
        self.bars.is_empty() && self.cfg.iter().all(|&b| b == 0)
    }

    fn set_u32(&mut self, offset: u16, value: u32) {
        let off = offset as usize;
        self.cfg[off..off + 4].copy_from_slice(&value.to_le_bytes());
    }
}

impl PciFramework for FakePci {
    fn allocate_bar(&mut self, index: u8, kind: BarKind, size: u64) -> Result<()> {
        if self.fail_bar == Some(index) {
            return Err(Error::Pci(format!("no room for BAR{} of {:#x} bytes", index, size)));
        }
        let next = match kind {
            BarKind::Mem64 => &mut self.next_mmio64,
            BarKind::Io | BarKind::Mem32 => &mut self.next_mmio32,
        };
        let addr = next.next_multiple_of(size);
        *next = addr + size;

        match kind {
            BarKind::Io => self.set_u32(cfg_space::bar(index), addr as u32 | 0x1),
            BarKind::Mem32 => self.set_u32(cfg_space::bar(index), addr as u32),
            BarKind::Mem64 => {
                self.set_u32(cfg_space::bar(index), addr as u32 | 0b1100);
                self.set_u32(cfg_space::bar(index + 1), (addr >> 32) as u32);
            }
        }
        self.bars.push(Bar {
            index,
            kind,
            size,
            addr,
        });
        Ok(())
    }

    fn write_config_u8(&mut self, offset: u16, value: u8) {
        self.cfg[offset as usize] = value;
    }

    fn write_config_u16(&mut self, offset: u16, value: u16) {
        let off = offset as usize;
        self.cfg[off..off + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn read_config_u32(&self, offset: u16) -> u32 {
        let off = offset as usize;
        u32::from_le_bytes(self.cfg[off..off + 4].try_into().unwrap())
    }
}

/// Records guest mappings instead of programming a hypervisor
#[derive(Default)]
pub struct FakeGuestMap {
    pub maps: Vec<(u64, u64, u64, Protection)>,
    pub fail: bool,
}

impl GuestMemoryMapper for FakeGuestMap {
    fn map_host_range(
        &mut self,
        guest_base: u64,
        size: u64,
        host_addr: u64,
        prot: Protection,
    ) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::Other, "vm_map_memseg_vma failed"));
        }
        self.maps.push((guest_base, size, host_addr, prot));
        Ok(())
    }
}

pub fn unique_name(tag: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("/ivshmem_test_{}_{}_{}", tag, std::process::id(), ts)
}
