// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::register::{RegisterFile, RegisterMap};
use crate::{check_word_access, SimResult, SimulationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerReg {
    Control,
    Value,
}

impl RegisterMap for TimerReg {
    const COUNT: usize = 4;

    fn index(self) -> usize {
        match self {
            TimerReg::Control => 0x00 >> 2,
            TimerReg::Value => 0x0C >> 2,
        }
    }

    fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(TimerReg::Control),
            3 => Some(TimerReg::Value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    #[default]
    Stopped,
    Running,
}

#[derive(Debug, Serialize, Deserialize)]
struct TimerSnapshot {
    state: TimerState,
    registers: Vec<u32>,
}

/// DIGIC free-running countdown timer.
///
/// Any write to CONTROL (re)starts a countdown from `LIMIT` at
/// `FREQUENCY_HZ`; the counter reloads when it runs out. Only the low 16
/// bits of the counter are visible through VALUE. The enable bit of the real
/// hardware is undocumented and not modeled.
#[derive(Debug, Default)]
pub struct DigicTimer {
    regs: RegisterFile<TimerReg>,
    state: TimerState,
}

impl DigicTimer {
    pub const MMIO_SIZE: u64 = 0x100;
    pub const FREQUENCY_HZ: u64 = 1_000_000;
    pub const LIMIT: u32 = 0xFFFF;

    pub const CONTROL: u64 = 0x00;
    pub const VALUE: u64 = 0x0C;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn registers(&self) -> &[u32] {
        self.regs.values()
    }

    /// Counter as seen by software.
    pub fn value(&self) -> u32 {
        self.regs.get(TimerReg::Value) & 0xFFFF
    }

    fn restart(&mut self) {
        self.regs.set(TimerReg::Value, Self::LIMIT);
        self.state = TimerState::Running;
    }
}

impl crate::Peripheral for DigicTimer {
    fn read(&mut self, offset: u64, size: u32) -> SimResult<u32> {
        check_word_access(offset, size)?;
        let value = match RegisterFile::<TimerReg>::decode(offset) {
            Ok(TimerReg::Value) => self.value(),
            Ok(reg) => {
                tracing::warn!(
                    target: "guest_error",
                    "digic-timer: read of write-only register {:?} at {:#x}",
                    reg,
                    offset
                );
                0
            }
            Err(e) => {
                tracing::warn!(target: "guest_error", "digic-timer: bad read: {}", e);
                0
            }
        };
        tracing::trace!("digic-timer: read {:#x} -> {:#x}", offset, value);
        Ok(value)
    }

    fn write(&mut self, offset: u64, size: u32, value: u32) -> SimResult<()> {
        check_word_access(offset, size)?;
        match RegisterFile::<TimerReg>::decode(offset) {
            Ok(TimerReg::Control) => {
                tracing::trace!("digic-timer: control <- {:#x}, restarting", value);
                // Latched for snapshots only; the value has no effect.
                self.regs.set(TimerReg::Control, value);
                self.restart();
            }
            Ok(reg) => {
                tracing::warn!(
                    target: "guest_error",
                    "digic-timer: write to read-only register {:?} at {:#x}",
                    reg,
                    offset
                );
            }
            Err(e) => {
                tracing::warn!(target: "guest_error", "digic-timer: bad write: {}", e);
            }
        }
        Ok(())
    }

    fn mmio_size(&self) -> u64 {
        Self::MMIO_SIZE
    }

    fn reset(&mut self) {
        self.regs.clear();
        self.state = TimerState::Stopped;
    }

    fn tick(&mut self) {
        self.advance(1);
    }

    fn advance(&mut self, periods: u64) {
        if self.state != TimerState::Running || periods == 0 {
            return;
        }

        // The counter walks LIMIT, LIMIT-1, .., 1 and then reloads, so one
        // reload period is LIMIT ticks long.
        let limit = Self::LIMIT as u64;
        let count = (self.regs.get(TimerReg::Value) as u64).clamp(1, limit);
        let steps = periods % limit;
        let next = if steps < count {
            count - steps
        } else {
            count + limit - steps
        };
        self.regs.set(TimerReg::Value, next as u32);
    }

    fn clock_hz(&self) -> Option<u64> {
        Some(Self::FREQUENCY_HZ)
    }

    fn snapshot(&self) -> serde_json::Value {
        let snap = TimerSnapshot {
            state: self.state,
            registers: self.regs.values().to_vec(),
        };
        serde_json::to_value(snap).unwrap_or(serde_json::Value::Null)
    }

    fn restore(&mut self, state: serde_json::Value) -> SimResult<()> {
        let snap: TimerSnapshot = serde_json::from_value(state)
            .map_err(|e| SimulationError::InvalidState(format!("digic-timer: {}", e)))?;
        self.regs
            .load(&snap.registers)
            .map_err(|e| SimulationError::InvalidState(format!("digic-timer: {}", e)))?;
        self.state = snap.state;
        Ok(())
    }
}
