// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_cpu_model() -> String {
    "arm946".to_string()
}

/// A firmware image to be programmed into one of the board's ROM slots.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RomImage {
    pub file: PathBuf,
    /// Byte-swap every 32-bit word of the image after loading.
    #[serde(default)]
    pub swap_words: bool,
}

impl RomImage {
    pub fn new<P: Into<PathBuf>>(file: P) -> Self {
        Self {
            file: file.into(),
            swap_words: false,
        }
    }
}

/// Static description of a board built around the DIGIC SoC.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BoardProfile {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_cpu_model")]
    pub cpu_model: String,
    pub ram_size: String, // e.g. "64MiB"
    #[serde(default)]
    pub rom0: Option<RomImage>,
    #[serde(default)]
    pub rom1: Option<RomImage>,
    #[serde(default)]
    pub start_addr: u64,
}

impl BoardProfile {
    pub fn new(name: &str, ram_size: &str) -> Self {
        Self {
            schema_version: default_schema_version(),
            name: name.to_string(),
            description: String::new(),
            cpu_model: default_cpu_model(),
            ram_size: ram_size.to_string(),
            rom0: None,
            rom1: None,
            start_addr: 0,
        }
    }

    /// Loads a profile from YAML. Relative ROM paths are resolved against the
    /// directory holding the profile.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read board profile {:?}", path))?;
        let mut profile = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse board profile {:?}", path))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        profile.resolve_rom_paths(base);
        tracing::debug!("Loaded board profile '{}' from {:?}", profile.name, path);
        Ok(profile)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let profile: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Board Profile YAML")?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.name.trim().is_empty() {
            anyhow::bail!("Board 'name' cannot be empty");
        }

        let ram = self.ram_bytes()?;
        if ram == 0 {
            anyhow::bail!("Board '{}' must have a non-zero 'ram_size'", self.name);
        }

        for (slot, rom) in self.rom_slots() {
            if let Some(rom) = rom {
                if rom.file.as_os_str().is_empty() {
                    anyhow::bail!("ROM slot {} image path cannot be empty", slot);
                }
            }
        }

        Ok(())
    }

    pub fn ram_bytes(&self) -> Result<u64> {
        parse_size(&self.ram_size)
            .with_context(|| format!("Invalid 'ram_size' for board '{}'", self.name))
    }

    /// Both ROM slots in address order, paired with their slot number.
    pub fn rom_slots(&self) -> [(usize, Option<&RomImage>); 2] {
        [(0, self.rom0.as_ref()), (1, self.rom1.as_ref())]
    }

    /// Rebases every relative ROM image path onto `dir`.
    pub fn resolve_rom_paths(&mut self, dir: &Path) {
        for rom in [self.rom0.as_mut(), self.rom1.as_mut()].into_iter().flatten() {
            if rom.file.is_relative() {
                rom.file = dir.join(&rom.file);
            }
        }
    }
}

/// Parses a byte count. Accepts human sizes ("64MiB", "4 MB") as well as
/// plain decimal or `0x`-prefixed hexadecimal numbers.
pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};

    let trimmed = size_str.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map_err(|e| anyhow::anyhow!("Invalid hex size '{}': {}", size_str, e));
    }
    if let Ok(bytes) = trimmed.parse::<u64>() {
        return Ok(bytes);
    }

    let s: Size = trimmed
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format '{}': {}", size_str, e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}
