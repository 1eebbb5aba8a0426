// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::register::{RegisterFile, RegisterMap};
use crate::serial::{SerialEndpoint, SerialEvent, SerialFrontend};
use crate::{check_word_access, lock_device, SimResult, SimulationError};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartReg {
    Tx,
    Rx,
    Status,
}

impl RegisterMap for UartReg {
    const COUNT: usize = 6;

    fn index(self) -> usize {
        match self {
            UartReg::Tx => 0x00 >> 2,
            UartReg::Rx => 0x04 >> 2,
            UartReg::Status => 0x14 >> 2,
        }
    }

    fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(UartReg::Tx),
            1 => Some(UartReg::Rx),
            5 => Some(UartReg::Status),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UartStatus: u32 {
        const RX_READY = 1 << 0;
        const TX_READY = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UartError {
    #[error("uart overrun: byte {rejected:#04x} delivered while {pending:#04x} is still unread")]
    RxOverrun { pending: u8, rejected: u8 },
}

#[derive(Debug, Serialize, Deserialize)]
struct UartSnapshot {
    registers: Vec<u32>,
}

/// DIGIC serial port: one transmit, one receive and one status register.
///
/// Transmission is synchronous so TX_READY never drops. Reception holds a
/// single byte; the endpoint must wait for `can_receive` before delivering the
/// next one.
#[derive(Debug)]
pub struct DigicUart {
    regs: RegisterFile<UartReg>,
    endpoint: Option<Arc<dyn SerialEndpoint>>,
}

impl Default for DigicUart {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DigicUart {
    pub const MMIO_SIZE: u64 = (UartReg::COUNT as u64) * 4;

    pub const TX: u64 = 0x00;
    pub const RX: u64 = 0x04;
    pub const STATUS: u64 = 0x14;

    pub fn new(endpoint: Option<Arc<dyn SerialEndpoint>>) -> Self {
        let mut uart = Self {
            regs: RegisterFile::new(),
            endpoint,
        };
        crate::Peripheral::reset(&mut uart);
        uart
    }

    /// Wraps the device for sharing and registers it with its endpoint.
    pub fn bind(uart: Self) -> Arc<Mutex<Self>> {
        let endpoint = uart.endpoint.clone();
        let shared = Arc::new(Mutex::new(uart));
        if let Some(endpoint) = endpoint {
            endpoint.attach(Arc::new(UartPort::new(&shared)));
            endpoint.on_event(SerialEvent::Opened);
        }
        shared
    }

    pub fn status(&self) -> UartStatus {
        UartStatus::from_bits_truncate(self.regs.get(UartReg::Status))
    }

    pub fn registers(&self) -> &[u32] {
        self.regs.values()
    }

    pub fn has_endpoint(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn can_receive(&self) -> bool {
        !self.status().contains(UartStatus::RX_READY)
    }

    /// Accepts the first byte of `buf` from the endpoint.
    pub fn receive(&mut self, buf: &[u8]) -> Result<usize, UartError> {
        let Some(&byte) = buf.first() else {
            return Ok(0);
        };

        if !self.can_receive() {
            let err = UartError::RxOverrun {
                pending: self.regs.get(UartReg::Rx) as u8,
                rejected: byte,
            };
            tracing::error!("digic-uart: {}", err);
            return Err(err);
        }

        self.regs.set(UartReg::Rx, byte as u32);
        self.regs.set_bits(UartReg::Status, UartStatus::RX_READY.bits());
        tracing::trace!("digic-uart: rx {:#04x}", byte);
        Ok(1)
    }

    fn transmit(&self, byte: u8) {
        let Some(endpoint) = &self.endpoint else {
            return;
        };
        if let Err(e) = endpoint.write_all(&[byte]) {
            tracing::warn!("digic-uart: endpoint rejected tx byte {:#04x}: {}", byte, e);
        }
    }
}

impl crate::Peripheral for DigicUart {
    fn read(&mut self, offset: u64, size: u32) -> SimResult<u32> {
        check_word_access(offset, size)?;
        let value = match RegisterFile::<UartReg>::decode(offset) {
            Ok(UartReg::Rx) => {
                let value = self.regs.get(UartReg::Rx);
                self.regs
                    .clear_bits(UartReg::Status, UartStatus::RX_READY.bits());
                value
            }
            Ok(UartReg::Status) => self.regs.get(UartReg::Status),
            Ok(UartReg::Tx) => {
                tracing::warn!(
                    target: "guest_error",
                    "digic-uart: read access to write-only register {:#x}",
                    offset
                );
                0
            }
            Err(e) => {
                tracing::warn!(
                    target: "guest_error",
                    "digic-uart: read access to unknown register: {}",
                    e
                );
                0
            }
        };
        Ok(value)
    }

    fn write(&mut self, offset: u64, size: u32, value: u32) -> SimResult<()> {
        check_word_access(offset, size)?;
        match RegisterFile::<UartReg>::decode(offset) {
            Ok(UartReg::Tx) => self.transmit(value as u8),
            Ok(UartReg::Status) => {}
            Ok(UartReg::Rx) => {
                tracing::warn!(
                    target: "guest_error",
                    "digic-uart: write access to read-only register {:#x}",
                    offset
                );
            }
            Err(e) => {
                tracing::warn!(
                    target: "guest_error",
                    "digic-uart: write access to unknown register: {}",
                    e
                );
            }
        }
        Ok(())
    }

    fn mmio_size(&self) -> u64 {
        Self::MMIO_SIZE
    }

    fn reset(&mut self) {
        self.regs.clear();
        self.regs.set(UartReg::Status, UartStatus::TX_READY.bits());
    }

    fn snapshot(&self) -> serde_json::Value {
        let snap = UartSnapshot {
            registers: self.regs.values().to_vec(),
        };
        serde_json::to_value(snap).unwrap_or(serde_json::Value::Null)
    }

    fn restore(&mut self, state: serde_json::Value) -> SimResult<()> {
        let snap: UartSnapshot = serde_json::from_value(state)
            .map_err(|e| SimulationError::InvalidState(format!("digic-uart: {}", e)))?;
        self.regs
            .load(&snap.registers)
            .map_err(|e| SimulationError::InvalidState(format!("digic-uart: {}", e)))
    }
}

/// Handle an endpoint uses to push bytes into a shared UART.
///
/// Holds the device weakly: once the machine is gone the port reports itself
/// disconnected and never ready.
pub struct UartPort {
    uart: Weak<Mutex<DigicUart>>,
}

impl UartPort {
    pub fn new(uart: &Arc<Mutex<DigicUart>>) -> Self {
        Self {
            uart: Arc::downgrade(uart),
        }
    }
}

impl SerialFrontend for UartPort {
    fn can_receive(&self) -> bool {
        self.uart
            .upgrade()
            .is_some_and(|uart| lock_device(&*uart).can_receive())
    }

    fn receive(&self, buf: &[u8]) -> Result<usize, UartError> {
        match self.uart.upgrade() {
            Some(uart) => lock_device(&*uart).receive(buf),
            None => Ok(0),
        }
    }

    fn event(&self, event: SerialEvent) {
        tracing::debug!("digic-uart: endpoint event {:?}", event);
    }

    fn is_connected(&self) -> bool {
        self.uart.strong_count() > 0
    }
}
