// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::cpu::Cpu;
use crate::snapshot::{ArmCpuSnapshot, CpuSnapshot};
use crate::{SimResult, SimulationError};

/// ARM946E-S register state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arm946 {
    /// r0-r12, sp (r13), lr (r14), pc (r15)
    pub regs: [u32; 16],
    pub cpsr: u32,
}

impl Default for Arm946 {
    fn default() -> Self {
        Self {
            regs: [0; 16],
            cpsr: Self::CPSR_RESET,
        }
    }
}

impl Arm946 {
    pub const MODEL: &'static str = "arm946";
    /// Supervisor mode, IRQ and FIQ masked, ARM state.
    pub const CPSR_RESET: u32 = 0x0000_00D3;

    const PC: usize = 15;
    const CPSR_ID: u8 = 16;

    pub fn new() -> Self {
        Self::default()
    }
}

impl Cpu for Arm946 {
    fn model(&self) -> &'static str {
        Self::MODEL
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn set_pc(&mut self, val: u32) {
        self.regs[Self::PC] = val;
    }

    fn get_pc(&self) -> u32 {
        self.regs[Self::PC]
    }

    fn get_register(&self, id: u8) -> u32 {
        match id {
            0..=15 => self.regs[id as usize],
            Self::CPSR_ID => self.cpsr,
            _ => 0,
        }
    }

    fn set_register(&mut self, id: u8, val: u32) {
        match id {
            0..=15 => self.regs[id as usize] = val,
            Self::CPSR_ID => self.cpsr = val,
            _ => {}
        }
    }

    fn get_register_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for i in 0..13 {
            names.push(format!("R{}", i));
        }
        names.push("SP".to_string());
        names.push("LR".to_string());
        names.push("PC".to_string());
        names.push("CPSR".to_string());
        names
    }

    fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot::Arm946(ArmCpuSnapshot {
            registers: self.regs.to_vec(),
            cpsr: self.cpsr,
        })
    }

    fn apply_snapshot(&mut self, snapshot: &CpuSnapshot) -> SimResult<()> {
        let CpuSnapshot::Arm946(s) = snapshot;
        let regs: [u32; 16] = s.registers.as_slice().try_into().map_err(|_| {
            SimulationError::InvalidState(format!(
                "arm946: snapshot holds {} registers, expected 16",
                s.registers.len()
            ))
        })?;
        self.regs = regs;
        self.cpsr = s.cpsr;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_state() {
        let mut cpu = Arm946::new();
        cpu.set_pc(0xFFC0_0000);
        cpu.set_register(0, 7);
        cpu.reset();
        assert_eq!(cpu.get_pc(), 0);
        assert_eq!(cpu.get_register(0), 0);
        assert_eq!(cpu.get_register(16), Arm946::CPSR_RESET);
    }

    #[test]
    fn test_register_names_cover_every_id() {
        let cpu = Arm946::new();
        let names = cpu.get_register_names();
        assert_eq!(names.len(), 17);
        assert_eq!(names[15], "PC");
        assert_eq!(names[16], "CPSR");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut cpu = Arm946::new();
        cpu.set_pc(0x1234);
        cpu.set_register(13, 0x8000);
        let snap = cpu.snapshot();

        let mut other = Arm946::new();
        other.apply_snapshot(&snap).unwrap();
        assert_eq!(other, cpu);
    }

    #[test]
    fn test_short_register_snapshot_rejected() {
        let mut cpu = Arm946::new();
        cpu.set_pc(0x40);
        let bad = CpuSnapshot::Arm946(ArmCpuSnapshot {
            registers: vec![1; 15],
            cpsr: 0x10,
        });
        assert!(cpu.apply_snapshot(&bad).is_err());
        assert_eq!(cpu.get_pc(), 0x40);
        assert_eq!(cpu.get_register(16), Arm946::CPSR_RESET);
    }
}
