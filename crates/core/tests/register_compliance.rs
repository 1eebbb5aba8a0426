// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko

use digic_config::BoardProfile;
use digic_core::peripherals::{DigicTimer, DigicUart};
use digic_core::system::soc::{timer_base, TIMER_COUNT, UART_BASE};
use digic_core::{create_board, Bus, SimulationError};

const TIMER_READABLE: &[u64] = &[DigicTimer::VALUE];
const UART_READABLE: &[u64] = &[DigicUart::RX, DigicUart::STATUS];

fn board() -> digic_core::DigicBoard {
    create_board(&BoardProfile::new("compliance", "1MiB"), None).unwrap()
}

#[test]
fn test_invalid_timer_reads_are_zero_and_side_effect_free() -> anyhow::Result<()> {
    let mut board = board();
    for i in 0..TIMER_COUNT {
        board.bus.write_u32(timer_base(i), 1)?;
    }
    board.advance_clock(42);

    for i in 0..TIMER_COUNT {
        let base = timer_base(i);
        let before = board.soc.timers[i].lock().unwrap().registers().to_vec();
        for offset in (0..DigicTimer::MMIO_SIZE).step_by(4) {
            if TIMER_READABLE.contains(&offset) {
                continue;
            }
            assert_eq!(board.bus.read_u32(base + offset)?, 0, "timer{} +{:#x}", i, offset);
        }
        let after = board.soc.timers[i].lock().unwrap().registers().to_vec();
        assert_eq!(before, after);
        assert_eq!(board.bus.read_u32(base + DigicTimer::VALUE)?, 0xFFFF - 42);
    }
    Ok(())
}

#[test]
fn test_invalid_uart_reads_are_zero_and_side_effect_free() -> anyhow::Result<()> {
    let mut board = board();
    board.soc.uart.lock().unwrap().receive(b"u")?;
    let before = board.soc.uart.lock().unwrap().registers().to_vec();

    for offset in (0..DigicUart::MMIO_SIZE).step_by(4) {
        if UART_READABLE.contains(&offset) {
            continue;
        }
        assert_eq!(board.bus.read_u32(UART_BASE + offset)?, 0, "uart +{:#x}", offset);
    }
    // Read-only and reserved registers ignore writes.
    for offset in [DigicUart::RX, 0x08, 0x0C, 0x10] {
        board.bus.write_u32(UART_BASE + offset, 0xFF)?;
    }

    assert_eq!(board.soc.uart.lock().unwrap().registers(), before.as_slice());
    Ok(())
}

#[test]
fn test_sub_word_accesses_rejected_everywhere() {
    let mut board = board();
    let mut windows: Vec<u64> = (0..TIMER_COUNT).map(timer_base).collect();
    windows.push(UART_BASE);

    for base in windows {
        for size in [1u32, 2] {
            assert_eq!(
                board.bus.read(base, size),
                Err(SimulationError::UnsupportedAccessSize { offset: 0, size })
            );
            assert_eq!(
                board.bus.write(base + 4, size, 0),
                Err(SimulationError::UnsupportedAccessSize { offset: 4, size })
            );
        }
    }
}

#[test]
fn test_unmapped_mmio_is_a_bus_fault() {
    let board = board();
    let gap = timer_base(TIMER_COUNT);
    assert_eq!(
        board.bus.read_u32(gap),
        Err(SimulationError::MemoryViolation(gap))
    );
    assert!(board.bus.read_u32(UART_BASE + DigicUart::MMIO_SIZE).is_err());
}
