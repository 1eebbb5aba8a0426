// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Physical layout and identification of a parallel NOR flash part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashGeometry {
    pub sector_size: u64,
    pub sector_count: u64,
    /// Bus width in bytes.
    pub width: u32,
    pub manufacturer_id: u16,
    pub device_id: u16,
    pub device_id2: u16,
    pub device_id3: u16,
    pub unlock_addr0: u16,
    pub unlock_addr1: u16,
}

impl FlashGeometry {
    /// Samsung K8P3215UQB, the 4 MiB part fitted to DIGIC4 cameras.
    pub const K8P3215UQB: FlashGeometry = FlashGeometry {
        sector_size: 64 * 1024,
        sector_count: 64,
        width: 4,
        manufacturer_id: 0x00EC,
        device_id: 0x007E,
        device_id2: 0x0003,
        device_id3: 0x0001,
        unlock_addr0: 0x0555,
        unlock_addr1: 0x02AA,
    };

    pub fn size(&self) -> u64 {
        self.sector_size * self.sector_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FlashError {
    #[error("flash access of {len} bytes at {offset:#x} exceeds the {size:#x}-byte device")]
    OutOfBounds { offset: u64, len: u64, size: u64 },
    #[error("flash sector {sector} does not exist ({count} sectors)")]
    NoSuchSector { sector: u64, count: u64 },
}

/// Storage behind a flash part: reads are plain, programming can only clear
/// bits and erasing sets a whole sector back to 0xFF.
pub struct NorFlash {
    geometry: FlashGeometry,
    data: Vec<u8>,
}

impl std::fmt::Debug for NorFlash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NorFlash")
            .field("geometry", &self.geometry)
            .finish()
    }
}

impl NorFlash {
    pub const ERASED: u8 = 0xFF;

    pub fn new(geometry: FlashGeometry) -> Self {
        Self {
            geometry,
            data: vec![Self::ERASED; geometry.size() as usize],
        }
    }

    pub fn geometry(&self) -> &FlashGeometry {
        &self.geometry
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn read_u8(&self, offset: u64) -> Option<u8> {
        self.data.get(offset as usize).copied()
    }

    pub fn read(&self, offset: u64, len: usize) -> Result<&[u8], FlashError> {
        let range = self.range(offset, len as u64)?;
        Ok(&self.data[range])
    }

    pub fn program(&mut self, offset: u64, bytes: &[u8]) -> Result<(), FlashError> {
        let range = self.range(offset, bytes.len() as u64)?;
        for (cell, &b) in self.data[range].iter_mut().zip(bytes) {
            *cell &= b;
        }
        Ok(())
    }

    pub fn erase_sector(&mut self, sector: u64) -> Result<(), FlashError> {
        if sector >= self.geometry.sector_count {
            return Err(FlashError::NoSuchSector {
                sector,
                count: self.geometry.sector_count,
            });
        }
        let start = (sector * self.geometry.sector_size) as usize;
        let end = start + self.geometry.sector_size as usize;
        self.data[start..end].fill(Self::ERASED);
        Ok(())
    }

    pub fn erase_all(&mut self) {
        self.data.fill(Self::ERASED);
    }

    fn range(&self, offset: u64, len: u64) -> Result<std::ops::Range<usize>, FlashError> {
        let end = offset.checked_add(len).filter(|&end| end <= self.size());
        match end {
            Some(end) => Ok(offset as usize..end as usize),
            None => Err(FlashError::OutOfBounds {
                offset,
                len,
                size: self.size(),
            }),
        }
    }
}
