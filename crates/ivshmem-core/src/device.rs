//! The ivshmem PCI device
//!
//! BAR0 holds the register file, BAR2 is a 64-bit memory BAR backed
//! directly by the shared memory object. Guest accesses to BAR2 never reach
//! the device: they hit the mapping installed at init.

use crate::config::IvshmemConfig;
use crate::pci::{BarKind, HardwareIds, PciFramework};
use crate::region::{GuestMemoryMapper, Region};
use crate::regs::{mask_to_width, RegisterFile, REG_SIZE};
use crate::{Error, Result};

/// BAR index of the register file
pub const IVSHMEM_MMIO_BAR: u8 = 0;

/// BAR index of the shared memory window
pub const IVSHMEM_MEM_BAR: u8 = 2;

/// Config space identity of an ivshmem device
pub const IVSHMEM_IDS: HardwareIds = HardwareIds {
    vendor_id: 0x1af4,
    device_id: 0x1110,
    revision_id: 0x01,
    base_class: 0x05,
};

/// Operations the PCI emulation invokes on an emulated device
pub trait PciDevice {
    /// Class name the device is instantiated by
    fn class_name(&self) -> &'static str;

    /// Attach the device using its option string
    fn init(
        &mut self,
        opts: &str,
        pci: &mut dyn PciFramework,
        guest: &mut dyn GuestMemoryMapper,
    ) -> Result<()>;

    /// Detach the device. Never fails.
    fn deinit(&mut self);

    /// Guest read of `width` bytes at `offset` within BAR `bar`
    fn bar_read(&mut self, bar: u8, offset: u64, width: usize) -> u64;

    /// Guest write of `width` bytes at `offset` within BAR `bar`
    fn bar_write(&mut self, bar: u8, offset: u64, width: usize, value: u64);
}

/// Instantiate the device registered under `class_name`
pub fn create(class_name: &str) -> Option<Box<dyn PciDevice>> {
    match class_name {
        IvshmemDevice::CLASS_NAME => Some(Box::new(IvshmemDevice::new())),
        _ => None,
    }
}

/// Inter-VM shared memory device
#[derive(Debug, Default)]
pub struct IvshmemDevice {
    regs: RegisterFile,
    config: Option<IvshmemConfig>,
    ids: Option<HardwareIds>,
    region: Option<Region>,
}

impl IvshmemDevice {
    pub const CLASS_NAME: &'static str = "ivshmem";

    pub fn new() -> Self {
        Self::default()
    }

    /// The attached shared memory, if any
    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    /// Mutable access to the attached shared memory, if any
    pub fn region_mut(&mut self) -> Option<&mut Region> {
        self.region.as_mut()
    }

    /// Options the attached region was set up from
    pub fn config(&self) -> Option<&IvshmemConfig> {
        self.config.as_ref()
    }

    /// Identity written to config space by the last `init`
    pub fn hardware_ids(&self) -> Option<HardwareIds> {
        self.ids
    }

    pub fn is_attached(&self) -> bool {
        self.region.is_some()
    }
}

impl PciDevice for IvshmemDevice {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn init(
        &mut self,
        opts: &str,
        pci: &mut dyn PciFramework,
        guest: &mut dyn GuestMemoryMapper,
    ) -> Result<()> {
        if let Some(region) = &self.region {
            return Err(Error::AlreadyAttached(region.name().to_string()));
        }

        let config = opts.parse::<IvshmemConfig>().map_err(|e| {
            log::warn!("ivshmem: {}", e);
            e
        })?;

        pci.set_hardware_ids(&IVSHMEM_IDS);
        pci.allocate_bar(IVSHMEM_MMIO_BAR, BarKind::Mem32, REG_SIZE)?;
        pci.allocate_bar(IVSHMEM_MEM_BAR, BarKind::Mem64, config.size)?;

        // TODO: re-establish the guest mapping when the guest reprograms
        // BAR2; until then the region is only reachable at this address.
        let addr = pci.bar_address(IVSHMEM_MEM_BAR);

        let region = Region::acquire(&config.name, config.size, addr, guest)?;
        log::info!(
            "ivshmem attached {} ({:?}), {:#x} bytes at {:#x}",
            config.name,
            region.role(),
            config.size,
            addr
        );
        self.region = Some(region);
        self.config = Some(config);
        self.ids = Some(IVSHMEM_IDS);
        Ok(())
    }

    fn deinit(&mut self) {
        match self.region.take() {
            Some(mut region) => {
                self.config = None;
                self.ids = None;
                region.release();
                log::info!("ivshmem detached {}", region.name());
            }
            None => log::warn!("ivshmem deinit: invalid ivshmem instance"),
        }
    }

    fn bar_read(&mut self, bar: u8, offset: u64, width: usize) -> u64 {
        log::trace!("ivshmem read: bar {}, offset {:#x}, width {}", bar, offset, width);
        if bar == IVSHMEM_MMIO_BAR {
            self.regs.read(offset, width)
        } else {
            mask_to_width(!0, width)
        }
    }

    fn bar_write(&mut self, bar: u8, offset: u64, width: usize, value: u64) {
        log::trace!(
            "ivshmem write: bar {}, offset {:#x}, width {}, value {:#x}",
            bar,
            offset,
            width,
            value
        );
        if bar == IVSHMEM_MMIO_BAR {
            self.regs.write(offset, width, value);
        }
    }
}
