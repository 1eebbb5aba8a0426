// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Byte-stream endpoints a UART can be bound to.
//!
//! The endpoint owns the outside world (a terminal, a capture buffer). The
//! device side registers a [`SerialFrontend`] with the endpoint on binding;
//! the endpoint then asks `can_receive` before pushing each byte.

use crate::peripherals::uart::UartError;
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialEvent {
    Opened,
    Closed,
}

/// Device side of a serial connection.
pub trait SerialFrontend: Send + Sync {
    fn can_receive(&self) -> bool;
    /// Delivers bytes from the endpoint. Returns how many were consumed.
    fn receive(&self, buf: &[u8]) -> Result<usize, UartError>;
    fn event(&self, _event: SerialEvent) {}

    /// False once the device behind this frontend is gone for good.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Host side of a serial connection.
pub trait SerialEndpoint: fmt::Debug + Send + Sync {
    /// Blocks until every byte is accepted.
    fn write_all(&self, buf: &[u8]) -> io::Result<()>;

    /// Registers the device that receives bytes from this endpoint.
    fn attach(&self, _frontend: Arc<dyn SerialFrontend>) {}

    /// Connection state changes reported by the device side.
    fn on_event(&self, _event: SerialEvent) {}
}

/// Endpoint that swallows output and never produces input.
#[derive(Debug, Default)]
pub struct NullSerial;

impl SerialEndpoint for NullSerial {
    fn write_all(&self, _buf: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

/// Endpoint recording everything transmitted and letting the host inject
/// received bytes by hand.
#[derive(Default)]
pub struct CaptureSerial {
    sink: Arc<Mutex<Vec<u8>>>,
    frontend: Mutex<Option<Arc<dyn SerialFrontend>>>,
    events: Mutex<Vec<SerialEvent>>,
}

impl fmt::Debug for CaptureSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSerial")
            .field("captured", &self.captured().len())
            .finish()
    }
}

impl CaptureSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: Arc<Mutex<Vec<u8>>>) -> Self {
        Self {
            sink,
            frontend: Mutex::new(None),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn sink(&self) -> Arc<Mutex<Vec<u8>>> {
        self.sink.clone()
    }

    pub fn captured(&self) -> Vec<u8> {
        crate::lock_device(&*self.sink).clone()
    }

    /// Events the device side has reported, oldest first.
    pub fn events(&self) -> Vec<SerialEvent> {
        crate::lock_device(&self.events).clone()
    }

    pub fn is_attached(&self) -> bool {
        crate::lock_device(&self.frontend).is_some()
    }

    pub fn can_inject(&self) -> bool {
        crate::lock_device(&self.frontend)
            .as_ref()
            .is_some_and(|f| f.can_receive())
    }

    /// Pushes one byte into the attached device, bypassing flow control so
    /// that callers observe overruns.
    pub fn inject(&self, byte: u8) -> Result<usize, UartError> {
        let frontend = crate::lock_device(&self.frontend).clone();
        match frontend {
            Some(frontend) => frontend.receive(&[byte]),
            None => Ok(0),
        }
    }
}

impl SerialEndpoint for CaptureSerial {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        crate::lock_device(&*self.sink).extend_from_slice(buf);
        Ok(())
    }

    fn attach(&self, frontend: Arc<dyn SerialFrontend>) {
        frontend.event(SerialEvent::Opened);
        *crate::lock_device(&self.frontend) = Some(frontend);
    }

    fn on_event(&self, event: SerialEvent) {
        crate::lock_device(&self.events).push(event);
    }
}

/// Endpoint bound to the process's stdin/stdout.
///
/// Attaching spawns a reader thread that feeds stdin into the device one byte
/// at a time, waiting while the device still holds an unread byte.
#[derive(Debug)]
pub struct StdioSerial {
    poll_interval: Duration,
}

impl Default for StdioSerial {
    fn default() -> Self {
        Self::new()
    }
}

impl StdioSerial {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
        }
    }

    /// Feeds `reader` into `frontend` one byte at a time, holding each byte
    /// until the device can take it. Returns at end of input, on a read error
    /// or once the device is disconnected.
    pub fn pump<R: Read>(
        mut reader: R,
        frontend: Arc<dyn SerialFrontend>,
        poll_interval: Duration,
    ) {
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte) {
                Ok(0) => {
                    tracing::debug!("stdio serial: end of input");
                    frontend.event(SerialEvent::Closed);
                    return;
                }
                Ok(_) => {
                    while !frontend.can_receive() {
                        if !frontend.is_connected() {
                            tracing::debug!(
                                "stdio serial: device disconnected, dropping {:#04x}",
                                byte[0]
                            );
                            return;
                        }
                        thread::sleep(poll_interval);
                    }
                    if let Err(e) = frontend.receive(&byte) {
                        tracing::error!("stdio serial: {}", e);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("stdio serial: read failed: {}", e);
                    frontend.event(SerialEvent::Closed);
                    return;
                }
            }
        }
    }
}

impl SerialEndpoint for StdioSerial {
    fn on_event(&self, event: SerialEvent) {
        tracing::debug!("stdio serial: device event {:?}", event);
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(buf)?;
        handle.flush()
    }

    fn attach(&self, frontend: Arc<dyn SerialFrontend>) {
        frontend.event(SerialEvent::Opened);
        let poll_interval = self.poll_interval;
        let spawned = thread::Builder::new()
            .name("serial-stdin".to_string())
            .spawn(move || Self::pump(io::stdin().lock(), frontend, poll_interval));
        if let Err(e) = spawned {
            tracing::warn!("stdio serial: could not start input thread: {}", e);
        }
    }
}
