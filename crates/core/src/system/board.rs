// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::{BusError, SystemBus};
use crate::clock::{ClockTarget, PeriodicClock};
use crate::memory::flash::FlashError;
use crate::memory::{load_image, swap_words, FlashGeometry, ImageError, NorFlash};
use crate::serial::SerialEndpoint;
use crate::snapshot::MachineSnapshot;
use crate::system::soc::{create_soc, DigicSoc, SocConfig, SocError};
use crate::{lock_device, SimResult, SimulationError};
use digic_config::BoardProfile;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const RAM_BASE: u64 = 0;
pub const ROM0_BASE: u64 = 0xF000_0000;
pub const ROM1_BASE: u64 = 0xF800_0000;
pub const ROM_WINDOW: u64 = 0x0800_0000;

pub fn rom_base(slot: usize) -> u64 {
    match slot {
        0 => ROM0_BASE,
        _ => ROM1_BASE,
    }
}

pub fn rom_name(slot: usize) -> String {
    format!("rom{}", slot)
}

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Soc(#[from] SocError),
    #[error("invalid board profile: {0}")]
    InvalidProfile(String),
    #[error("invalid RAM size: {0}")]
    InvalidRamSize(String),
    #[error("cannot load ROM{slot} image")]
    RomImage {
        slot: usize,
        #[source]
        source: ImageError,
    },
    #[error("cannot program ROM{slot}")]
    Flash {
        slot: usize,
        #[source]
        source: FlashError,
    },
    #[error("cannot map board memory")]
    Bus(#[from] BusError),
    #[error("entry point {0:#x} is outside the 32-bit address space")]
    EntryOutOfRange(u64),
}

/// A complete machine: SoC, memory map and the profile it was built from.
#[derive(Debug)]
pub struct DigicBoard {
    pub profile: BoardProfile,
    pub soc: DigicSoc,
    pub bus: SystemBus,
}

/// Builds a board from `profile`, binding the SoC UART to `serial`.
pub fn create_board(
    profile: &BoardProfile,
    serial: Option<Arc<dyn SerialEndpoint>>,
) -> Result<DigicBoard, BoardError> {
    profile
        .validate()
        .map_err(|e| BoardError::InvalidProfile(format!("{:#}", e)))?;
    info!("Board: building '{}'", profile.name);

    let mut bus = SystemBus::new();
    let mut soc = create_soc(
        &mut bus,
        SocConfig {
            cpu_model: profile.cpu_model.clone(),
            serial,
        },
    )?;

    let ram_size = profile
        .ram_bytes()
        .map_err(|e| BoardError::InvalidRamSize(format!("{:#}", e)))?;
    bus.map_ram(RAM_BASE, ram_size)?;
    info!("Board: {} bytes of RAM at {:#x}", ram_size, RAM_BASE);

    for (slot, rom) in profile.rom_slots() {
        let Some(rom) = rom else {
            continue;
        };
        let flash = program_rom(slot, rom)?;
        bus.map_flash(&rom_name(slot), rom_base(slot), ROM_WINDOW, flash)?;
        info!(
            "Board: ROM{} {:?} at {:#x}",
            slot,
            rom.file,
            rom_base(slot)
        );
    }

    let entry = entry_point(profile)?;
    soc.cpu.set_pc(entry);
    info!("Board: entry point {:#x}", entry);

    Ok(DigicBoard {
        profile: profile.clone(),
        soc,
        bus,
    })
}

fn entry_point(profile: &BoardProfile) -> Result<u32, BoardError> {
    u32::try_from(profile.start_addr).map_err(|_| BoardError::EntryOutOfRange(profile.start_addr))
}

fn program_rom(slot: usize, rom: &digic_config::RomImage) -> Result<NorFlash, BoardError> {
    let mut flash = NorFlash::new(FlashGeometry::K8P3215UQB);
    let mut image =
        load_image(&rom.file, flash.size()).map_err(|source| BoardError::RomImage { slot, source })?;
    if rom.swap_words {
        swap_words(&mut image);
    }
    flash
        .program(0, &image)
        .map_err(|source| BoardError::Flash { slot, source })?;
    Ok(flash)
}

impl DigicBoard {
    pub fn entry_point(&self) -> u32 {
        self.profile.start_addr as u32
    }

    /// Resets the CPU and every device, then points the CPU at the entry
    /// point again. RAM and flash contents survive.
    pub fn reset(&mut self) {
        self.soc.cpu.reset();
        self.bus.reset_peripherals();
        self.soc.cpu.set_pc(self.entry_point());
        tracing::debug!("Board: reset, pc={:#x}", self.entry_point());
    }

    /// Advances every clocked device by `periods` periods of its own clock.
    pub fn advance_clock(&self, periods: u64) {
        for p in &self.bus.peripherals {
            let mut dev = lock_device(&*p.dev);
            if dev.clock_hz().is_some() {
                dev.advance(periods);
            }
        }
    }

    pub fn clock_targets(&self) -> Vec<ClockTarget> {
        self.bus
            .peripherals
            .iter()
            .filter_map(|p| {
                let hz = lock_device(&*p.dev).clock_hz()?;
                Some(ClockTarget {
                    name: p.name.clone(),
                    dev: p.dev.clone(),
                    frequency_hz: hz,
                })
            })
            .collect()
    }

    /// Starts a background thread ticking the clocked devices in real time.
    pub fn start_clock(&self, quantum: Duration) -> std::io::Result<PeriodicClock> {
        PeriodicClock::spawn(self.clock_targets(), quantum)
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        let mut peripherals = BTreeMap::new();
        for p in &self.bus.peripherals {
            peripherals.insert(p.name.clone(), lock_device(&*p.dev).snapshot());
        }
        MachineSnapshot {
            machine: self.profile.name.clone(),
            cpu: self.soc.cpu.snapshot(),
            peripherals,
        }
    }

    /// Restores CPU and device state. Either every part is restored or the
    /// machine is left exactly as it was.
    pub fn apply_snapshot(&mut self, snapshot: &MachineSnapshot) -> SimResult<()> {
        if snapshot.machine != self.profile.name {
            return Err(SimulationError::InvalidState(format!(
                "snapshot of '{}' cannot be applied to '{}'",
                snapshot.machine, self.profile.name
            )));
        }
        if let Some(name) = snapshot
            .peripherals
            .keys()
            .find(|name| self.bus.peripheral(name).is_none())
        {
            return Err(SimulationError::InvalidState(format!(
                "unknown peripheral '{}'",
                name
            )));
        }

        let saved = self.snapshot();
        match self.restore_parts(snapshot) {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("Board: snapshot rejected, rolling back: {}", e);
                if let Err(rollback) = self.restore_parts(&saved) {
                    tracing::error!("Board: rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    fn restore_parts(&mut self, snapshot: &MachineSnapshot) -> SimResult<()> {
        self.soc.cpu.apply_snapshot(&snapshot.cpu)?;
        for (name, state) in &snapshot.peripherals {
            let dev = self.bus.peripheral(name).ok_or_else(|| {
                SimulationError::InvalidState(format!("unknown peripheral '{}'", name))
            })?;
            lock_device(&**dev).restore(state.clone())?;
        }
        Ok(())
    }
}
