use rayon::prelude::*;
use std::{fs, ops::Range, path::Path};
use thiserror::Error;

use crate::{compress_to_bytes, CompressError, DecompressError, Decompressed, Decompressor};

mod map;
pub use map::{MapError, RomMap, RomMetadata, TileEntry};

/// Domestic game name in the cartridge header.
const TITLE_RANGE: Range<usize> = 0x120..0x150;

/// A cartridge image held in memory.
#[derive(Debug, Clone)]
pub struct Rom {
    data: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum RomError {
    #[error("Failed to access ROM file")]
    Io(#[from] std::io::Error),
    #[error("Offset {offset:#07x} lies outside of the {len:#x} byte image")]
    OffsetOutOfBounds { offset: usize, len: usize },
    #[error("Failed to decompress block at {offset:#07x}")]
    Decompress {
        offset: usize,
        #[source]
        source: DecompressError,
    },
    #[error("Failed to compress data for block at {offset:#07x}")]
    Compress {
        offset: usize,
        #[source]
        source: CompressError,
    },
    #[error("Recompressed block at {offset:#07x} grew from {original} to {new} bytes")]
    BlockGrew {
        offset: usize,
        original: usize,
        new: usize,
    },
}

impl Rom {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        let data = fs::read(path.as_ref())?;
        Ok(Self::from_bytes(data))
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn crc(&self) -> u32 {
        crc32fast::hash(&self.data)
    }

    /// Game name from the header, if the image has a readable one.
    pub fn title(&self) -> Option<String> {
        let raw = self.data.get(TITLE_RANGE)?;
        if !raw.is_ascii() {
            return None;
        }

        let title = String::from_utf8_lossy(raw);
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");

        (!title.is_empty()).then_some(title)
    }

    /// Decode the block whose size header sits at `offset`.
    pub fn extract(&self, offset: usize) -> Result<Decompressed, RomError> {
        if offset >= self.data.len() {
            return Err(RomError::OffsetOutOfBounds {
                offset,
                len: self.data.len(),
            });
        }

        Decompressor::new(&self.data, offset)
            .decompress()
            .map_err(|source| RomError::Decompress { offset, source })
    }

    /// Decode every block in `offsets`. Results come back in the same order.
    pub fn extract_all(&self, offsets: &[usize]) -> Vec<(usize, Result<Decompressed, RomError>)> {
        offsets
            .par_iter()
            .map(|&offset| (offset, self.extract(offset)))
            .collect()
    }

    /// Compress `raw` and write it over the block at `offset`.
    ///
    /// The new block has to fit into the space of the old one, anything past
    /// its end is left untouched. Returns the size of the new block.
    pub fn insert(&mut self, offset: usize, raw: &[u8]) -> Result<usize, RomError> {
        let original = self.extract(offset)?.bytes_read;

        let block =
            compress_to_bytes(raw).map_err(|source| RomError::Compress { offset, source })?;

        if block.len() > original {
            return Err(RomError::BlockGrew {
                offset,
                original,
                new: block.len(),
            });
        }

        self.data[offset..offset + block.len()].copy_from_slice(&block);
        log::debug!(
            "inserted {} byte block at {:#07x} ({} bytes free)",
            block.len(),
            offset,
            original - block.len()
        );

        Ok(block.len())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RomError> {
        fs::write(path.as_ref(), &self.data)?;
        Ok(())
    }
}
