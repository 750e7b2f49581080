//! ivshmem MMIO register file (BAR0)
//!
//! Interrupts and doorbells are not wired up, so every register is inert:
//! mask, status and IV position read as zero, writes only ever get logged.

/// Size of the register BAR
pub const REG_SIZE: u64 = 0x100;

/// Register offsets within BAR0
pub mod reg {
    pub const IRQ_MASK: u64 = 0x00;
    pub const IRQ_STATUS: u64 = 0x04;
    pub const IV_POSITION: u64 = 0x08;
    pub const DOORBELL: u64 = 0x0c;
}

/// A decoded doorbell write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Doorbell {
    /// Interrupt vector to raise on the peer
    pub vector: u8,
    /// Destination peer
    pub peer: u8,
}

impl From<u64> for Doorbell {
    fn from(value: u64) -> Self {
        Self {
            vector: (value & 0xff) as u8,
            peer: ((value >> 16) & 0xff) as u8,
        }
    }
}

/// Truncate `value` to an access of `width` bytes
///
/// Widths other than 1, 2 and 4 pass the value through untouched.
pub fn mask_to_width(value: u64, width: usize) -> u64 {
    match width {
        1 => value & 0xff,
        2 => value & 0xffff,
        4 => value & 0xffff_ffff,
        _ => value,
    }
}

/// The ivshmem control registers
#[derive(Debug, Default, Clone, Copy)]
pub struct RegisterFile;

impl RegisterFile {
    pub fn new() -> Self {
        Self
    }

    /// Read a register. Unknown offsets read as all ones.
    pub fn read(&self, offset: u64, width: usize) -> u64 {
        let value = match offset {
            reg::IRQ_MASK | reg::IRQ_STATUS => 0,
            // Without interrupt support the IV position is always zero,
            // otherwise it would be our peer id.
            reg::IV_POSITION => 0,
            _ => {
                log::debug!("ivshmem read: invalid device register {:#x}", offset);
                !0
            }
        };
        mask_to_width(value, width)
    }

    /// Write a register. Writes never fail and never change what reads return.
    pub fn write(&mut self, offset: u64, width: usize, value: u64) {
        match offset {
            reg::IRQ_MASK | reg::IRQ_STATUS => {}
            reg::DOORBELL => {
                let doorbell = Doorbell::from(value);
                log::warn!(
                    "Doorbell capability doesn't support for now, ignore vectors {:#x}, peer id {}",
                    doorbell.vector,
                    doorbell.peer
                );
            }
            _ => {
                log::debug!(
                    "ivshmem write: invalid device register {:#x}, width {}, value {:#x}",
                    offset,
                    width,
                    value
                );
            }
        }
    }
}
