// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod clock;
pub mod cpu;
pub mod memory;
pub mod peripherals;
pub mod register;
pub mod serial;
pub mod snapshot;
pub mod system;

use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Unsupported {size}-byte access at offset {offset:#x}")]
    UnsupportedAccessSize { offset: u64, size: u32 },
    #[error("Invalid peripheral state: {0}")]
    InvalidState(String),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait representing a memory-mapped peripheral.
///
/// Offsets are relative to the start of the peripheral's MMIO window and
/// `size` is the access width in bytes.
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&mut self, offset: u64, size: u32) -> SimResult<u32>;
    fn write(&mut self, offset: u64, size: u32, value: u32) -> SimResult<()>;

    /// Size in bytes of the MMIO window the device decodes.
    fn mmio_size(&self) -> u64;

    fn reset(&mut self) {}

    /// Advance the device by one period of its clock.
    fn tick(&mut self) {}

    /// Advance the device by `periods` periods of its clock.
    fn advance(&mut self, periods: u64) {
        for _ in 0..periods {
            self.tick();
        }
    }

    /// Nominal input clock, for devices that need to be ticked.
    fn clock_hz(&self) -> Option<u64> {
        None
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn restore(&mut self, _state: serde_json::Value) -> SimResult<()> {
        Ok(())
    }
}

/// A peripheral shared between the bus and asynchronous drivers (clock,
/// serial endpoint). Every access goes through the per-device lock.
pub type SharedPeripheral = Arc<Mutex<dyn Peripheral>>;

/// Locks a device, recovering the guard if a previous holder panicked.
pub fn lock_device<T: ?Sized>(dev: &Mutex<T>) -> MutexGuard<'_, T> {
    dev.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Rejects anything other than a naturally sized 32-bit access.
pub fn check_word_access(offset: u64, size: u32) -> SimResult<()> {
    if size != 4 {
        return Err(SimulationError::UnsupportedAccessSize { offset, size });
    }
    Ok(())
}

/// Trait representing the system bus
pub trait Bus {
    fn read(&self, addr: u64, size: u32) -> SimResult<u32>;
    fn write(&mut self, addr: u64, size: u32, value: u32) -> SimResult<()>;

    fn read_u8(&self, addr: u64) -> SimResult<u8> {
        Ok(self.read(addr, 1)? as u8)
    }

    fn read_u16(&self, addr: u64) -> SimResult<u16> {
        Ok(self.read(addr, 2)? as u16)
    }

    fn read_u32(&self, addr: u64) -> SimResult<u32> {
        self.read(addr, 4)
    }

    fn write_u8(&mut self, addr: u64, value: u8) -> SimResult<()> {
        self.write(addr, 1, value as u32)
    }

    fn write_u16(&mut self, addr: u64, value: u16) -> SimResult<()> {
        self.write(addr, 2, value as u32)
    }

    fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        self.write(addr, 4, value)
    }
}

pub use cpu::Cpu;
pub use system::board::{create_board, DigicBoard};
pub use system::registry::MachineRegistry;
pub use system::soc::{create_soc, DigicSoc, SocConfig};
