// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod timer;
pub mod uart;

pub use timer::DigicTimer;
pub use uart::{DigicUart, UartPort};
