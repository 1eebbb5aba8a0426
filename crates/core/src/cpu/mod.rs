// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod arm946;

pub use arm946::Arm946;

use crate::snapshot::CpuSnapshot;
use crate::SimResult;

/// Architectural state of a CPU core, as seen by the machine composer and
/// debug tooling. Instruction execution lives with the core's driver.
pub trait Cpu: std::fmt::Debug + Send {
    fn model(&self) -> &'static str;
    fn reset(&mut self);
    fn set_pc(&mut self, val: u32);
    fn get_pc(&self) -> u32;

    // Debug Access
    fn get_register(&self, id: u8) -> u32;
    fn set_register(&mut self, id: u8, val: u32);
    fn get_register_names(&self) -> Vec<String>;
    fn snapshot(&self) -> CpuSnapshot;
    /// Leaves the core untouched when the snapshot is malformed.
    fn apply_snapshot(&mut self, snapshot: &CpuSnapshot) -> SimResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CpuError {
    #[error("Unable to find CPU definition '{0}' (supported: {supported})", supported = SUPPORTED_MODELS.join(", "))]
    UnknownModel(String),
}

pub const SUPPORTED_MODELS: &[&str] = &[Arm946::MODEL];

/// Instantiates a core by model name.
pub fn create_cpu(model: &str) -> Result<Box<dyn Cpu>, CpuError> {
    match model.trim().to_ascii_lowercase().as_str() {
        Arm946::MODEL => Ok(Box::new(Arm946::new())),
        _ => Err(CpuError::UnknownModel(model.to_string())),
    }
}
