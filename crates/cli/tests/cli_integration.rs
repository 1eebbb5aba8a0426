use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const FLASH_SIZE: usize = 4 * 1024 * 1024;

fn temp_dir(prefix: &str) -> PathBuf {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("digic-cli-{}-{}", prefix, nonce));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn digic(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_digic"))
        .args(args)
        .output()
        .expect("Failed to execute digic")
}

fn a1100_bios_dir() -> PathBuf {
    let dir = temp_dir("bios");
    let mut image = vec![0u8; FLASH_SIZE];
    image[..4].copy_from_slice(&0xEA00_0000u32.to_le_bytes());
    std::fs::write(dir.join("canon-a1100-rom1.bin"), image).unwrap();
    dir
}

#[test]
fn test_list_machines() {
    let output = digic(&["--list-machines"]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .find(|l| l.starts_with("canon-a1100"))
        .expect("canon-a1100 not listed");
    assert!(line.contains("Canon PowerShot A1100 IS"));
    assert!(line.contains("(default)"));
}

#[test]
fn test_default_machine_without_rom_is_config_error() {
    let empty = temp_dir("empty");
    let output = digic(&["-L", empty.to_str().unwrap(), "--serial", "null"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("canon-a1100-rom1.bin"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_machine_is_config_error() {
    let output = digic(&["--machine", "eos-7d", "--serial", "none"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("canon-a1100"));
}

#[test]
fn test_a1100_boots_and_snapshots() {
    let bios = a1100_bios_dir();
    let snap_path = bios.join("state.json");
    let output = digic(&[
        "--machine",
        "canon-a1100",
        "-L",
        bios.to_str().unwrap(),
        "--serial",
        "null",
        "--ticks",
        "16",
        "--snapshot",
        snap_path.to_str().unwrap(),
    ]);
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let text = std::fs::read_to_string(&snap_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["machine"], "canon-a1100");
    assert_eq!(json["cpu"]["type"], "arm946");
    assert_eq!(json["cpu"]["registers"][15], 0xFFC0_0000u64);
    for name in ["timer0", "timer1", "timer2", "uart"] {
        assert!(json["peripherals"].get(name).is_some(), "{} missing", name);
    }
    // Timers were never started, so ticking leaves them idle.
    assert_eq!(json["peripherals"]["timer0"]["state"], "stopped");
    assert_eq!(json["peripherals"]["uart"]["registers"][5], 2);
}

#[test]
fn test_board_profile_with_overrides() {
    let dir = temp_dir("board");
    let profile = dir.join("bare.yaml");
    std::fs::write(
        &profile,
        "name: \"bare\"\ndescription: \"RAM only\"\nram_size: \"1MiB\"\n",
    )
    .unwrap();
    let snap_path = dir.join("bare.json");

    let output = digic(&[
        "--board",
        profile.to_str().unwrap(),
        "--ram-size",
        "2MiB",
        "--entry",
        "0x100",
        "--serial",
        "none",
        "--run-ms",
        "10",
        "--snapshot",
        snap_path.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(0));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&snap_path).unwrap()).unwrap();
    assert_eq!(json["machine"], "bare");
    assert_eq!(json["cpu"]["registers"][15], 0x100);
}

#[test]
fn test_oversized_rom_is_config_error() {
    let dir = temp_dir("oversized");
    let rom = dir.join("big.bin");
    std::fs::write(&rom, vec![0u8; FLASH_SIZE + 1]).unwrap();

    let output = digic(&[
        "--machine",
        "canon-a1100",
        "--rom1",
        rom.to_str().unwrap(),
        "--serial",
        "none",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("larger than"));
}

#[test]
fn test_bad_ram_size_is_config_error() {
    let bios = a1100_bios_dir();
    let output = digic(&[
        "-L",
        bios.to_str().unwrap(),
        "--ram-size",
        "lots",
        "--serial",
        "none",
    ]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_unwritable_snapshot_is_runtime_error() {
    let bios = a1100_bios_dir();
    let snap_path = bios.join("missing-dir").join("state.json");
    let output = digic(&[
        "-L",
        bios.to_str().unwrap(),
        "--serial",
        "null",
        "--snapshot",
        snap_path.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(3));
}
