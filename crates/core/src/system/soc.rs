// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::{BusError, SystemBus};
use crate::cpu::{create_cpu, Cpu, CpuError};
use crate::peripherals::{DigicTimer, DigicUart};
use crate::serial::SerialEndpoint;
use crate::SharedPeripheral;
use std::sync::{Arc, Mutex};
use tracing::info;

pub const DEFAULT_CPU_MODEL: &str = "arm946";

pub const TIMER_COUNT: usize = 3;
pub const TIMER_BASE: u64 = 0xC021_0000;
pub const TIMER_STRIDE: u64 = 0x100;
pub const UART_BASE: u64 = 0xC080_0000;
pub const UART_NAME: &str = "uart";

pub fn timer_base(index: usize) -> u64 {
    TIMER_BASE + index as u64 * TIMER_STRIDE
}

pub fn timer_name(index: usize) -> String {
    format!("timer{}", index)
}

#[derive(Debug, Clone)]
pub struct SocConfig {
    pub cpu_model: String,
    /// Console endpoint the UART is bound to; `None` leaves it unconnected.
    pub serial: Option<Arc<dyn SerialEndpoint>>,
}

impl Default for SocConfig {
    fn default() -> Self {
        Self {
            cpu_model: DEFAULT_CPU_MODEL.to_string(),
            serial: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SocError {
    #[error(transparent)]
    UnknownCpuModel(#[from] CpuError),
    #[error("cannot map SoC peripheral")]
    Bus(#[from] BusError),
}

/// CPU core plus the on-chip devices, already mapped on a bus.
#[derive(Debug)]
pub struct DigicSoc {
    pub cpu: Box<dyn Cpu>,
    pub timers: Vec<Arc<Mutex<DigicTimer>>>,
    pub uart: Arc<Mutex<DigicUart>>,
}

/// Instantiates the DIGIC core and maps its peripherals onto `bus`.
///
/// The CPU is created first so an unsupported model fails before anything is
/// mapped.
pub fn create_soc(bus: &mut SystemBus, config: SocConfig) -> Result<DigicSoc, SocError> {
    let cpu = create_cpu(&config.cpu_model)?;
    info!("SoC: CPU {}", cpu.model());

    let mut timers = Vec::with_capacity(TIMER_COUNT);
    for i in 0..TIMER_COUNT {
        let timer = Arc::new(Mutex::new(DigicTimer::new()));
        let dev: SharedPeripheral = timer.clone();
        bus.map_peripheral(&timer_name(i), timer_base(i), dev)?;
        timers.push(timer);
    }

    if config.serial.is_none() {
        info!("SoC: no console endpoint, UART left unconnected");
    }
    let uart = DigicUart::bind(DigicUart::new(config.serial));
    let dev: SharedPeripheral = uart.clone();
    bus.map_peripheral(UART_NAME, UART_BASE, dev)?;

    info!(
        "SoC: {} timers at {:#x}, uart at {:#x}",
        TIMER_COUNT, TIMER_BASE, UART_BASE
    );

    Ok(DigicSoc { cpu, timers, uart })
}
