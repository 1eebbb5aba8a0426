// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use digic_config::{BoardProfile, RomImage};
use digic_core::serial::{NullSerial, SerialEndpoint, StdioSerial};
use digic_core::{create_board, DigicBoard, MachineRegistry};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const EXIT_OK: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const CLOCK_QUANTUM: Duration = Duration::from_millis(1);

fn parse_u32_addr(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex address '{}': {}", s, e))
    } else {
        u32::from_str(trimmed).map_err(|e| format!("Invalid address '{}': {}", s, e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SerialMode {
    /// UART output to stdout, input from stdin
    Stdio,
    /// UART connected to a sink that discards output
    Null,
    /// UART left unconnected
    None,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Canon DIGIC SoC model", long_about = None)]
struct Cli {
    /// Built-in machine to instantiate (see --list-machines)
    #[arg(short = 'M', long, conflicts_with = "board")]
    machine: Option<String>,

    /// Board profile (YAML) to instantiate instead of a built-in machine
    #[arg(short, long)]
    board: Option<PathBuf>,

    /// List the built-in machines and exit
    #[arg(long)]
    list_machines: bool,

    /// Console endpoint for the SoC UART
    #[arg(long, value_enum, default_value = "stdio")]
    serial: SerialMode,

    /// Advance every timer by this many clock periods before exiting
    #[arg(long, default_value = "0")]
    ticks: u64,

    /// Run the real-time clock for this many milliseconds before exiting
    #[arg(long)]
    run_ms: Option<u64>,

    /// Write the final machine state (JSON) to this file
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Enable debug logging, including register traffic
    #[arg(short, long)]
    trace: bool,

    /// Override the RAM size (e.g. "32MiB", "0x2000000")
    #[arg(long)]
    ram_size: Option<String>,

    /// Firmware image for ROM slot 0
    #[arg(long)]
    rom0: Option<PathBuf>,

    /// Firmware image for ROM slot 1
    #[arg(long)]
    rom1: Option<PathBuf>,

    /// Override the entry point
    #[arg(long, value_parser = parse_u32_addr)]
    entry: Option<u32>,

    /// Directory holding the ROM images of the built-in machines
    #[arg(short = 'L', long)]
    bios_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout belongs to the guest console.
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    let registry = MachineRegistry::builtin();

    if cli.list_machines {
        list_machines(&registry);
        return ExitCode::from(EXIT_OK);
    }

    let profile = match resolve_profile(&cli, &registry) {
        Ok(profile) => profile,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let serial: Option<Arc<dyn SerialEndpoint>> = match cli.serial {
        SerialMode::Stdio => Some(Arc::new(StdioSerial::new())),
        SerialMode::Null => Some(Arc::new(NullSerial)),
        SerialMode::None => None,
    };

    let board = match create_board(&profile, serial)
        .with_context(|| format!("Failed to build machine '{}'", profile.name))
    {
        Ok(board) => board,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    info!(
        "Machine '{}' ready, entry point {:#x}",
        profile.name,
        board.entry_point()
    );

    if let Err(e) = run(&cli, &board) {
        error!("{:#}", e);
        return ExitCode::from(EXIT_RUNTIME_ERROR);
    }

    ExitCode::from(EXIT_OK)
}

fn list_machines(registry: &MachineRegistry) {
    println!("Supported machines are:");
    for entry in registry.entries() {
        let marker = if registry.default_machine() == Some(entry.name.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("{:<16} {}{}", entry.name, entry.description, marker);
    }
}

fn resolve_profile(cli: &Cli, registry: &MachineRegistry) -> anyhow::Result<BoardProfile> {
    let mut profile = if let Some(path) = &cli.board {
        info!("Loading board profile: {:?}", path);
        BoardProfile::from_file(path)?
    } else {
        let name = match (&cli.machine, registry.default_machine()) {
            (Some(name), _) => name.as_str(),
            (None, Some(name)) => name,
            (None, None) => anyhow::bail!("No machine selected and no default machine"),
        };
        let mut profile = registry.get(name).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown machine '{}' (available: {})",
                name,
                registry.names().join(", ")
            )
        })?;
        if let Some(dir) = &cli.bios_dir {
            profile.resolve_rom_paths(dir);
        }
        profile
    };

    if let Some(ram_size) = &cli.ram_size {
        profile.ram_size = ram_size.clone();
    }
    if let Some(rom0) = &cli.rom0 {
        profile.rom0 = Some(RomImage::new(rom0));
    }
    if let Some(rom1) = &cli.rom1 {
        profile.rom1 = Some(RomImage::new(rom1));
    }
    if let Some(entry) = cli.entry {
        profile.start_addr = entry as u64;
    }
    profile
        .validate()
        .with_context(|| format!("Invalid configuration for machine '{}'", profile.name))?;
    Ok(profile)
}

fn run(cli: &Cli, board: &DigicBoard) -> anyhow::Result<()> {
    if cli.ticks > 0 {
        board.advance_clock(cli.ticks);
        info!("Advanced clocked devices by {} periods", cli.ticks);
    }

    if let Some(ms) = cli.run_ms {
        let mut clock = board
            .start_clock(CLOCK_QUANTUM)
            .context("Failed to start the machine clock")?;
        std::thread::sleep(Duration::from_millis(ms));
        clock.stop();
        info!("Ran for {} ms", ms);
    }

    if let Some(path) = &cli.snapshot {
        write_snapshot(path, board)?;
        info!("Snapshot written to {:?}", path);
    }

    Ok(())
}

fn write_snapshot(path: &Path, board: &DigicBoard) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create snapshot {:?}", path))?;
    serde_json::to_writer_pretty(file, &board.snapshot())
        .with_context(|| format!("Failed to write snapshot {:?}", path))
}
