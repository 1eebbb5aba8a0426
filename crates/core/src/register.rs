// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Word-addressed register storage shared by the peripheral models.

use std::fmt;
use std::marker::PhantomData;

/// The named registers of one device.
///
/// `COUNT` is the number of 32-bit slots the device declares; a register's
/// index is its byte offset shifted right by two.
pub trait RegisterMap: Copy + Eq + fmt::Debug {
    const COUNT: usize;

    fn index(self) -> usize;
    fn from_index(index: usize) -> Option<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
    #[error("register index {index} (offset {offset:#x}) is outside of the {count} declared registers")]
    OutOfRange {
        offset: u64,
        index: usize,
        count: usize,
    },
    #[error("no register decoded at offset {offset:#x}")]
    Unmapped { offset: u64 },
    #[error("register state holds {found} values, expected {expected}")]
    LengthMismatch { found: usize, expected: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile<R: RegisterMap> {
    values: Vec<u32>,
    _map: PhantomData<R>,
}

impl<R: RegisterMap> Default for RegisterFile<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RegisterMap> RegisterFile<R> {
    pub fn new() -> Self {
        Self {
            values: vec![0; R::COUNT],
            _map: PhantomData,
        }
    }

    /// Decodes a byte offset into a named register.
    pub fn decode(offset: u64) -> Result<R, RegisterError> {
        let index = (offset >> 2) as usize;
        if index >= R::COUNT {
            return Err(RegisterError::OutOfRange {
                offset,
                index,
                count: R::COUNT,
            });
        }
        R::from_index(index).ok_or(RegisterError::Unmapped { offset })
    }

    pub fn get(&self, reg: R) -> u32 {
        self.values[reg.index()]
    }

    pub fn set(&mut self, reg: R, value: u32) {
        self.values[reg.index()] = value;
    }

    pub fn set_bits(&mut self, reg: R, mask: u32) {
        self.values[reg.index()] |= mask;
    }

    pub fn clear_bits(&mut self, reg: R, mask: u32) {
        self.values[reg.index()] &= !mask;
    }

    pub fn get_index(&self, index: usize) -> Result<u32, RegisterError> {
        self.values
            .get(index)
            .copied()
            .ok_or(RegisterError::OutOfRange {
                offset: (index as u64) << 2,
                index,
                count: R::COUNT,
            })
    }

    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0);
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn load(&mut self, values: &[u32]) -> Result<(), RegisterError> {
        if values.len() != R::COUNT {
            return Err(RegisterError::LengthMismatch {
                found: values.len(),
                expected: R::COUNT,
            });
        }
        self.values.copy_from_slice(values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Demo {
        Ctrl,
        Data,
    }

    impl RegisterMap for Demo {
        const COUNT: usize = 4;

        fn index(self) -> usize {
            match self {
                Demo::Ctrl => 0,
                Demo::Data => 3,
            }
        }

        fn from_index(index: usize) -> Option<Self> {
            match index {
                0 => Some(Demo::Ctrl),
                3 => Some(Demo::Data),
                _ => None,
            }
        }
    }

    #[test]
    fn test_decode_offsets() {
        assert_eq!(RegisterFile::<Demo>::decode(0x00), Ok(Demo::Ctrl));
        assert_eq!(RegisterFile::<Demo>::decode(0x0C), Ok(Demo::Data));
        // Sub-word offsets land on the containing word.
        assert_eq!(RegisterFile::<Demo>::decode(0x0E), Ok(Demo::Data));
        assert_eq!(
            RegisterFile::<Demo>::decode(0x04),
            Err(RegisterError::Unmapped { offset: 0x04 })
        );
        assert_eq!(
            RegisterFile::<Demo>::decode(0x10),
            Err(RegisterError::OutOfRange {
                offset: 0x10,
                index: 4,
                count: 4
            })
        );
    }

    #[test]
    fn test_bit_helpers() {
        let mut regs = RegisterFile::<Demo>::new();
        regs.set(Demo::Data, 0xF0);
        regs.set_bits(Demo::Data, 0x0F);
        assert_eq!(regs.get(Demo::Data), 0xFF);
        regs.clear_bits(Demo::Data, 0x81);
        assert_eq!(regs.get(Demo::Data), 0x7E);
        assert_eq!(regs.get(Demo::Ctrl), 0);
        assert_eq!(regs.get_index(3), Ok(0x7E));
        assert!(regs.get_index(4).is_err());
    }

    #[test]
    fn test_load_checks_length() {
        let mut regs = RegisterFile::<Demo>::new();
        assert!(regs.load(&[1, 2, 3]).is_err());
        regs.load(&[1, 2, 3, 4]).unwrap();
        assert_eq!(regs.values(), &[1, 2, 3, 4]);
        regs.clear();
        assert_eq!(regs.values(), &[0, 0, 0, 0]);
    }
}
