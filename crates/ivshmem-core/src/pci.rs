//! PCI configuration space definitions and the framework interface
//!
//! Config space, BAR allocation and access decode belong to the VMM's PCI
//! emulation. Devices only talk to it through [`PciFramework`].

use crate::Result;

/// Offsets into the type 00h configuration space header
pub mod cfg_space {
    pub const VENDOR_ID: u16 = 0x00;
    pub const DEVICE_ID: u16 = 0x02;
    pub const REVISION_ID: u16 = 0x08;
    pub const BASE_CLASS: u16 = 0x0b;
    pub const BAR0: u16 = 0x10;

    /// Config offset of BAR register `index`
    pub const fn bar(index: u8) -> u16 {
        BAR0 + 4 * index as u16
    }
}

/// Memory BAR type bits (bits 2:1) selecting a 64-bit BAR
pub const BAR_MEM_TYPE_64: u32 = 0b100;

/// Mask selecting the base address of a memory BAR
pub const BAR_MEM_BASE_MASK: u64 = !0xf;

/// Kind of address window a BAR decodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarKind {
    Io,
    Mem32,
    /// Occupies this BAR register and the next one
    Mem64,
}

/// Hardware IDs published in config space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareIds {
    pub vendor_id: u16,
    pub device_id: u16,
    pub revision_id: u8,
    pub base_class: u8,
}

/// The VMM's PCI emulation as seen from a device
pub trait PciFramework {
    /// Reserve a guest address window for BAR `index`
    fn allocate_bar(&mut self, index: u8, kind: BarKind, size: u64) -> Result<()>;

    fn write_config_u8(&mut self, offset: u16, value: u8);

    fn write_config_u16(&mut self, offset: u16, value: u16);

    fn read_config_u32(&self, offset: u16) -> u32;

    /// Decoded guest base address of memory BAR `index`
    ///
    /// For a 64-bit BAR the high dword comes from the following register.
    fn bar_address(&self, index: u8) -> u64 {
        let low = self.read_config_u32(cfg_space::bar(index));
        let mut addr = low as u64;
        if low & BAR_MEM_TYPE_64 != 0 {
            addr |= (self.read_config_u32(cfg_space::bar(index + 1)) as u64) << 32;
        }
        addr & BAR_MEM_BASE_MASK
    }

    /// Publish vendor/device/revision/class
    fn set_hardware_ids(&mut self, ids: &HardwareIds) {
        self.write_config_u16(cfg_space::VENDOR_ID, ids.vendor_id);
        self.write_config_u16(cfg_space::DEVICE_ID, ids.device_id);
        self.write_config_u8(cfg_space::REVISION_ID, ids.revision_id);
        self.write_config_u8(cfg_space::BASE_CLASS, ids.base_class);
    }
}
