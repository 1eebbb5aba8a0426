// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use digic_config::{BoardProfile, RomImage};

#[test]
fn test_full_profile_parses() {
    let yaml = r#"
schema_version: "1.0"
name: "canon-a1100"
description: "Canon PowerShot A1100 IS"
cpu_model: "arm946"
ram_size: "64MiB"
rom1:
  file: "canon-a1100-rom1.bin"
start_addr: 0xFFC00000
"#;
    let profile = BoardProfile::from_yaml(yaml).unwrap();
    assert_eq!(profile.name, "canon-a1100");
    assert_eq!(profile.description, "Canon PowerShot A1100 IS");
    assert_eq!(profile.ram_bytes().unwrap(), 0x0400_0000);
    assert_eq!(profile.rom0, None);
    assert_eq!(
        profile.rom1,
        Some(RomImage::new("canon-a1100-rom1.bin"))
    );
    assert_eq!(profile.start_addr, 0xFFC0_0000);
}

#[test]
fn test_missing_ram_size_is_an_error() {
    let yaml = r#"
name: "no-ram"
"#;
    assert!(BoardProfile::from_yaml(yaml).is_err());
}

#[test]
fn test_bad_ram_size_reports_board_name() {
    let yaml = r#"
name: "typo"
ram_size: "64 potatoes"
"#;
    let err = BoardProfile::from_yaml(yaml).unwrap_err();
    assert!(format!("{:#}", err).contains("typo"));
}

#[test]
fn test_empty_rom_path_rejected() {
    let yaml = r#"
name: "empty-rom"
ram_size: "1MiB"
rom0:
  file: ""
"#;
    let err = BoardProfile::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("ROM slot 0"));
}

#[test]
fn test_rom_slots_are_in_slot_order() {
    let mut profile = BoardProfile::new("slots", "1MiB");
    profile.rom1 = Some(RomImage::new("b.bin"));

    let slots = profile.rom_slots();
    assert_eq!(slots[0].0, 0);
    assert!(slots[0].1.is_none());
    assert_eq!(slots[1].0, 1);
    assert_eq!(slots[1].1.unwrap().file.to_str(), Some("b.bin"));
}
