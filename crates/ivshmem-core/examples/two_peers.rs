//! Two ivshmem devices sharing one segment
//!
//! Plays the device model of two VMs in one process: the first device
//! creates the segment, the second joins it, and bytes written through one
//! mapping show up in the other.
//!
//! Usage:
//! ```bash
//! cargo run --example two_peers -- /ivshmem_demo,64K
//! ```

use ivshmem_core::device::{IVSHMEM_MEM_BAR, IVSHMEM_MMIO_BAR};
use ivshmem_core::pci::cfg_space;
use ivshmem_core::regs::reg;
use ivshmem_core::{BarKind, GuestMemoryMapper, IvshmemDevice, PciDevice, PciFramework, Protection};
use std::io;

/// Config space with BARs placed at fixed addresses
struct DemoPci {
    cfg: [u8; 0x40],
}

impl PciFramework for DemoPci {
    fn allocate_bar(&mut self, index: u8, kind: BarKind, _size: u64) -> ivshmem_core::Result<()> {
        let off = cfg_space::bar(index) as usize;
        match kind {
            BarKind::Mem64 => {
                self.cfg[off..off + 4].copy_from_slice(&0x0000_000cu32.to_le_bytes());
                self.cfg[off + 4..off + 8].copy_from_slice(&0x0000_0001u32.to_le_bytes());
            }
            BarKind::Mem32 | BarKind::Io => {
                self.cfg[off..off + 4].copy_from_slice(&0xfeb0_0000u32.to_le_bytes());
            }
        }
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
        u32::from_le_bytes([self.cfg[off], self.cfg[off + 1], self.cfg[off + 2], self.cfg[off + 3]])
    }
}

/// Prints what a hypervisor would be asked to map
struct DemoGuest(&'static str);

impl GuestMemoryMapper for DemoGuest {
    fn map_host_range(&mut self, guest_base: u64, size: u64, host_addr: u64, prot: Protection) -> io::Result<()> {
        println!(
            "[{}] map gpa {:#x}..{:#x} -> hva {:#x} ({:?})",
            self.0,
            guest_base,
            guest_base + size,
            host_addr,
            prot
        );
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/ivshmem_demo,64K".to_string());

    let mut vm_a = IvshmemDevice::new();
    let mut vm_b = IvshmemDevice::new();
    vm_a.init(&opts, &mut DemoPci { cfg: [0; 0x40] }, &mut DemoGuest("vm-a"))?;
    vm_b.init(&opts, &mut DemoPci { cfg: [0; 0x40] }, &mut DemoGuest("vm-b"))?;

    for (label, dev) in [("vm-a", &vm_a), ("vm-b", &vm_b)] {
        if let Some(region) = dev.region() {
            println!("[{}] {:?}", label, region);
        }
    }

    let message = b"Hello from vm-a over ivshmem";
    if let Some(shared) = vm_a.region_mut().and_then(|r| r.as_mut_slice()) {
        shared[..message.len()].copy_from_slice(message);
    }
    if let Some(shared) = vm_b.region().and_then(|r| r.as_slice()) {
        println!("[vm-b] read: {}", String::from_utf8_lossy(&shared[..message.len()]));
    }

    vm_a.bar_write(IVSHMEM_MMIO_BAR, reg::DOORBELL, 4, 0x0001_0000);
    println!(
        "[vm-a] IVPosition = {:#x}, BAR2 read through emulation = {:#x}",
        vm_a.bar_read(IVSHMEM_MMIO_BAR, reg::IV_POSITION, 4),
        vm_a.bar_read(IVSHMEM_MEM_BAR, 0, 4)
    );

    vm_b.deinit();
    vm_a.deinit();
    Ok(())
}
