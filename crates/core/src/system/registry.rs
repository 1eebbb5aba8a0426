// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::serial::SerialEndpoint;
use crate::system::board::{create_board, BoardError, DigicBoard};
use digic_config::{BoardProfile, RomImage};
use std::sync::Arc;

pub type ProfileFactory = fn() -> BoardProfile;

#[derive(Debug, Clone)]
pub struct MachineEntry {
    pub name: String,
    pub description: String,
    pub factory: ProfileFactory,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown machine '{name}' (available: {available})")]
    UnknownMachine { name: String, available: String },
    #[error("machine '{0}' is already registered")]
    Duplicate(String),
    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Named board profiles the driver can instantiate.
#[derive(Debug, Default)]
pub struct MachineRegistry {
    entries: Vec<MachineEntry>,
    default: Option<String>,
}

pub fn canon_a1100() -> BoardProfile {
    let mut profile = BoardProfile::new("canon-a1100", "64MiB");
    profile.description = "Canon PowerShot A1100 IS".to_string();
    profile.rom1 = Some(RomImage::new("canon-a1100-rom1.bin"));
    profile.start_addr = 0xFFC0_0000;
    profile
}

impl MachineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every machine this build knows about.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.entries.push(MachineEntry {
            name: "canon-a1100".to_string(),
            description: "Canon PowerShot A1100 IS".to_string(),
            factory: canon_a1100,
        });
        registry.default = Some("canon-a1100".to_string());
        registry
    }

    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        factory: ProfileFactory,
    ) -> Result<(), RegistryError> {
        if self.lookup(name).is_some() {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.entries.push(MachineEntry {
            name: name.to_string(),
            description: description.to_string(),
            factory,
        });
        Ok(())
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), RegistryError> {
        self.lookup(name).ok_or_else(|| self.unknown(name))?;
        self.default = Some(name.to_string());
        Ok(())
    }

    pub fn default_machine(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn entries(&self) -> &[MachineEntry] {
        &self.entries
    }

    /// Returns a fresh copy of the named machine's profile.
    pub fn get(&self, name: &str) -> Option<BoardProfile> {
        self.lookup(name).map(|e| (e.factory)())
    }

    pub fn create(
        &self,
        name: &str,
        serial: Option<Arc<dyn SerialEndpoint>>,
    ) -> Result<DigicBoard, RegistryError> {
        let profile = self.get(name).ok_or_else(|| self.unknown(name))?;
        Ok(create_board(&profile, serial)?)
    }

    fn lookup(&self, name: &str) -> Option<&MachineEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    fn unknown(&self, name: &str) -> RegistryError {
        RegistryError::UnknownMachine {
            name: name.to_string(),
            available: self.names().join(", "),
        }
    }
}
