// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::{LinearMemory, NorFlash};
use crate::{lock_device, SharedPeripheral, SimResult, SimulationError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error(
        "region '{name}' at {base:#x}+{size:#x} overlaps '{other}' at {other_base:#x}+{other_size:#x}"
    )]
    Overlap {
        name: String,
        base: u64,
        size: u64,
        other: String,
        other_base: u64,
        other_size: u64,
    },
    #[error("region '{name}' has zero size")]
    Empty { name: String },
    #[error("region '{name}' at {base:#x} wraps the address space")]
    Wraps { name: String, base: u64 },
}

#[derive(Debug)]
pub struct PeripheralEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub dev: SharedPeripheral,
}

/// A flash part decoded over a window larger than itself. Offsets beyond the
/// part wrap around to its start.
#[derive(Debug)]
pub struct FlashRegion {
    pub name: String,
    pub base: u64,
    pub window: u64,
    pub flash: NorFlash,
}

impl FlashRegion {
    fn offset(&self, addr: u64) -> u64 {
        (addr - self.base) % self.flash.size()
    }
}

/// Physical address space of a board: RAM, flash windows and MMIO devices.
#[derive(Debug, Default)]
pub struct SystemBus {
    pub ram: Option<LinearMemory>,
    pub flash: Vec<FlashRegion>,
    pub peripherals: Vec<PeripheralEntry>,
}

impl SystemBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_ram(&mut self, base: u64, size: u64) -> Result<(), BusError> {
        self.check_free("ram", base, size)?;
        tracing::debug!("bus: ram at {:#x}, {} bytes", base, size);
        self.ram = Some(LinearMemory::new(size as usize, base));
        Ok(())
    }

    pub fn map_flash(
        &mut self,
        name: &str,
        base: u64,
        window: u64,
        flash: NorFlash,
    ) -> Result<(), BusError> {
        if flash.size() == 0 {
            return Err(BusError::Empty {
                name: name.to_string(),
            });
        }
        self.check_free(name, base, window)?;
        tracing::debug!(
            "bus: flash '{}' at {:#x}, window {:#x}, part {:#x}",
            name,
            base,
            window,
            flash.size()
        );
        self.flash.push(FlashRegion {
            name: name.to_string(),
            base,
            window,
            flash,
        });
        Ok(())
    }

    pub fn map_peripheral(
        &mut self,
        name: &str,
        base: u64,
        dev: SharedPeripheral,
    ) -> Result<(), BusError> {
        let size = lock_device(&*dev).mmio_size();
        self.check_free(name, base, size)?;
        tracing::debug!("bus: '{}' at {:#x}+{:#x}", name, base, size);
        self.peripherals.push(PeripheralEntry {
            name: name.to_string(),
            base,
            size,
            dev,
        });
        Ok(())
    }

    pub fn peripheral(&self, name: &str) -> Option<&SharedPeripheral> {
        self.peripherals
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.dev)
    }

    pub fn flash_region(&self, name: &str) -> Option<&FlashRegion> {
        self.flash.iter().find(|f| f.name == name)
    }

    pub fn flash_region_mut(&mut self, name: &str) -> Option<&mut FlashRegion> {
        self.flash.iter_mut().find(|f| f.name == name)
    }

    /// Every mapped region as `(name, base, size)`, in mapping order.
    pub fn regions(&self) -> Vec<(String, u64, u64)> {
        let mut out = Vec::new();
        if let Some(ram) = &self.ram {
            out.push(("ram".to_string(), ram.base_addr, ram.size()));
        }
        for f in &self.flash {
            out.push((f.name.clone(), f.base, f.window));
        }
        for p in &self.peripherals {
            out.push((p.name.clone(), p.base, p.size));
        }
        out
    }

    /// Resets every mapped device. Memory contents are left alone.
    pub fn reset_peripherals(&self) {
        for p in &self.peripherals {
            lock_device(&*p.dev).reset();
        }
    }

    fn check_free(&self, name: &str, base: u64, size: u64) -> Result<(), BusError> {
        if size == 0 {
            return Err(BusError::Empty {
                name: name.to_string(),
            });
        }
        if base.checked_add(size).is_none() {
            return Err(BusError::Wraps {
                name: name.to_string(),
                base,
            });
        }
        for (other, other_base, other_size) in self.regions() {
            if base < other_base + other_size && other_base < base + size {
                return Err(BusError::Overlap {
                    name: name.to_string(),
                    base,
                    size,
                    other,
                    other_base,
                    other_size,
                });
            }
        }
        Ok(())
    }

    /// Accesses wider than a word, or empty ones, never reach a region.
    fn check_access_size(addr: u64, size: u32) -> SimResult<()> {
        match size {
            1 | 2 | 4 => Ok(()),
            _ => Err(SimulationError::UnsupportedAccessSize { offset: addr, size }),
        }
    }

    fn find_peripheral(&self, addr: u64) -> Option<&PeripheralEntry> {
        self.peripherals
            .iter()
            .find(|p| addr >= p.base && addr < p.base + p.size)
    }

    fn find_flash(&self, addr: u64) -> Option<&FlashRegion> {
        self.flash
            .iter()
            .find(|f| addr >= f.base && addr < f.base + f.window)
    }
}

impl crate::Bus for SystemBus {
    fn read(&self, addr: u64, size: u32) -> SimResult<u32> {
        Self::check_access_size(addr, size)?;
        if let Some(ram) = &self.ram {
            if ram.contains(addr) {
                return ram
                    .read(addr, size)
                    .ok_or(SimulationError::MemoryViolation(addr));
            }
        }

        if let Some(region) = self.find_flash(addr) {
            let mut value = 0u32;
            for i in (0..size as u64).rev() {
                let offset = region.offset(addr + i);
                let byte = region
                    .flash
                    .read_u8(offset)
                    .ok_or(SimulationError::MemoryViolation(addr + i))?;
                value = (value << 8) | byte as u32;
            }
            return Ok(value);
        }

        if let Some(p) = self.find_peripheral(addr) {
            return lock_device(&*p.dev).read(addr - p.base, size);
        }

        Err(SimulationError::MemoryViolation(addr))
    }

    fn write(&mut self, addr: u64, size: u32, value: u32) -> SimResult<()> {
        Self::check_access_size(addr, size)?;
        if let Some(ram) = &mut self.ram {
            if ram.contains(addr) {
                return if ram.write(addr, size, value) {
                    Ok(())
                } else {
                    Err(SimulationError::MemoryViolation(addr))
                };
            }
        }

        if let Some(region) = self.find_flash(addr) {
            tracing::warn!(
                target: "guest_error",
                "bus: ignoring {}-byte write of {:#x} to flash '{}' at {:#x}",
                size,
                value,
                region.name,
                addr
            );
            return Ok(());
        }

        if let Some(p) = self.find_peripheral(addr) {
            return lock_device(&*p.dev).write(addr - p.base, size, value);
        }

        Err(SimulationError::MemoryViolation(addr))
    }
}
