// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Wall-clock driver for clocked devices.

use crate::{lock_device, SharedPeripheral};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ClockTarget {
    pub name: String,
    pub dev: SharedPeripheral,
    pub frequency_hz: u64,
}

/// Background thread advancing devices at their nominal rate.
///
/// Each quantum the thread works out how many periods should have elapsed
/// since it started and delivers whatever is still owed, so sleep jitter does
/// not accumulate as drift.
#[derive(Debug)]
pub struct PeriodicClock {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicClock {
    pub fn spawn(targets: Vec<ClockTarget>, quantum: Duration) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name("digic-clock".to_string())
            .spawn(move || Self::run(targets, quantum, flag))?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    fn run(targets: Vec<ClockTarget>, quantum: Duration, stop: Arc<AtomicBool>) {
        tracing::debug!(
            "clock: driving {} device(s), quantum {:?}",
            targets.len(),
            quantum
        );
        let start = Instant::now();
        let mut delivered = vec![0u64; targets.len()];

        while !stop.load(Ordering::Relaxed) {
            thread::sleep(quantum);
            let elapsed = start.elapsed().as_nanos();
            for (target, done) in targets.iter().zip(delivered.iter_mut()) {
                let due = (elapsed * target.frequency_hz as u128 / 1_000_000_000) as u64;
                if due > *done {
                    lock_device(&*target.dev).advance(due - *done);
                    *done = due;
                }
            }
        }

        for (target, done) in targets.iter().zip(&delivered) {
            tracing::debug!("clock: {} advanced {} periods", target.name, done);
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the thread and waits for it to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("clock: thread panicked");
            }
        }
    }
}

impl Drop for PeriodicClock {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripherals::DigicTimer;
    use crate::Peripheral;
    use std::sync::Mutex;

    #[test]
    fn test_clock_advances_running_timer() {
        let timer = Arc::new(Mutex::new(DigicTimer::new()));
        timer.lock().unwrap().write(DigicTimer::CONTROL, 4, 1).unwrap();

        let dev: SharedPeripheral = timer.clone();
        let mut clock = PeriodicClock::spawn(
            vec![ClockTarget {
                name: "timer0".to_string(),
                dev,
                frequency_hz: DigicTimer::FREQUENCY_HZ,
            }],
            Duration::from_millis(1),
        )
        .unwrap();
        assert!(clock.is_running());

        thread::sleep(Duration::from_millis(30));
        clock.stop();
        assert!(!clock.is_running());

        let after = timer.lock().unwrap().value();
        assert_ne!(after, 0xFFFF);

        // Stopped clock no longer moves the counter.
        thread::sleep(Duration::from_millis(5));
        assert_eq!(timer.lock().unwrap().value(), after);
    }
}
