// DigicSim - Canon DIGIC SoC Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod flash;

pub use flash::{FlashGeometry, NorFlash};

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("cannot read image {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image {path:?} is {size} bytes, larger than the {max} bytes available")]
    TooLarge { path: PathBuf, size: u64, max: u64 },
}

/// Reads a raw binary image, refusing anything larger than `max_size`.
pub fn load_image(path: &Path, max_size: u64) -> Result<Vec<u8>, ImageError> {
    let io_err = |source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > max_size {
        return Err(ImageError::TooLarge {
            path: path.to_path_buf(),
            size,
            max: max_size,
        });
    }

    let data = std::fs::read(path).map_err(io_err)?;
    // The file may have grown between the two calls.
    if data.len() as u64 > max_size {
        return Err(ImageError::TooLarge {
            path: path.to_path_buf(),
            size: data.len() as u64,
            max: max_size,
        });
    }

    tracing::debug!("Loaded image {:?} ({} bytes)", path, data.len());
    Ok(data)
}

/// Byte-swaps every complete 32-bit word in place. A trailing partial word is
/// left untouched.
pub fn swap_words(data: &mut [u8]) {
    for word in data.chunks_exact_mut(4) {
        word.reverse();
    }
}

/// A simple flat memory storage
pub struct LinearMemory {
    pub data: Vec<u8>,
    pub base_addr: u64,
}

impl std::fmt::Debug for LinearMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearMemory")
            .field("base_addr", &format_args!("{:#x}", self.base_addr))
            .field("size", &self.data.len())
            .finish()
    }
}

impl LinearMemory {
    pub fn new(size: usize, base_addr: u64) -> Self {
        Self {
            data: vec![0; size],
            base_addr,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base_addr && addr < self.base_addr + self.size()
    }

    pub fn read_u8(&self, addr: u64) -> Option<u8> {
        if self.contains(addr) {
            Some(self.data[(addr - self.base_addr) as usize])
        } else {
            None
        }
    }

    pub fn write_u8(&mut self, addr: u64, value: u8) -> bool {
        if self.contains(addr) {
            self.data[(addr - self.base_addr) as usize] = value;
            true
        } else {
            false
        }
    }

    /// Little-endian read of up to four bytes; `None` unless the whole access
    /// fits.
    pub fn read(&self, addr: u64, size: u32) -> Option<u32> {
        if size == 0
            || size > 4
            || !self.contains(addr)
            || !self.contains(addr + size as u64 - 1)
        {
            return None;
        }
        let start = (addr - self.base_addr) as usize;
        let bytes = &self.data[start..start + size as usize];
        Some(
            bytes
                .iter()
                .rev()
                .fold(0u32, |acc, &b| (acc << 8) | b as u32),
        )
    }

    pub fn write(&mut self, addr: u64, size: u32, value: u32) -> bool {
        if size == 0
            || size > 4
            || !self.contains(addr)
            || !self.contains(addr + size as u64 - 1)
        {
            return false;
        }
        let start = (addr - self.base_addr) as usize;
        for i in 0..size as usize {
            self.data[start + i] = (value >> (i * 8)) as u8;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_image(prefix: &str, len: usize) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push("digic-core-tests");
        let _ = std::fs::create_dir_all(&dir);
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = dir.join(format!("{}-{}.bin", prefix, nonce));
        let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_memory_read_write() {
        let mut mem = LinearMemory::new(1024, 0x1000);

        // Valid write
        assert!(mem.write_u8(0x1000, 42));
        assert!(mem.write_u8(0x13FF, 99)); // Last byte

        // Invalid write (out of bounds)
        assert!(!mem.write_u8(0x0FFF, 1));
        assert!(!mem.write_u8(0x1400, 1));

        // Valid read
        assert_eq!(mem.read_u8(0x1000), Some(42));
        assert_eq!(mem.read_u8(0x13FF), Some(99));

        // Invalid read
        assert_eq!(mem.read_u8(0x0FFF), None);
        assert_eq!(mem.read_u8(0x1400), None);
    }

    #[test]
    fn test_wide_access_is_little_endian() {
        let mut mem = LinearMemory::new(16, 0);
        assert!(mem.write(4, 4, 0x1122_3344));
        assert_eq!(mem.read_u8(4), Some(0x44));
        assert_eq!(mem.read_u8(7), Some(0x11));
        assert_eq!(mem.read(4, 2), Some(0x3344));
        assert_eq!(mem.read(4, 4), Some(0x1122_3344));

        // Straddling the end is refused as a whole.
        assert_eq!(mem.read(14, 4), None);
        assert!(!mem.write(14, 4, 0));
        assert_eq!(mem.read_u8(14), Some(0));

        // Nothing wider than a word.
        assert_eq!(mem.read(0, 8), None);
        assert!(!mem.write(0, 8, 0x1122_3344));
        assert_eq!(mem.read(0, 4), Some(0));
    }

    #[test]
    fn test_load_image_limits() {
        let exact = temp_image("exact", 64);
        assert_eq!(load_image(&exact, 64).unwrap().len(), 64);

        let over = temp_image("over", 65);
        match load_image(&over, 64) {
            Err(ImageError::TooLarge { size, max, .. }) => {
                assert_eq!(size, 65);
                assert_eq!(max, 64);
            }
            other => panic!("expected TooLarge, got {:?}", other),
        }

        let missing = exact.with_extension("missing");
        assert!(matches!(
            load_image(&missing, 64),
            Err(ImageError::Io { .. })
        ));
    }

    #[test]
    fn test_swap_words() {
        let mut data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        swap_words(&mut data);
        assert_eq!(data, vec![4, 3, 2, 1, 8, 7, 6, 5, 9, 10]);
    }
}
