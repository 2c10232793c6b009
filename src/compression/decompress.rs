use super::{unframe, ControlByte, OpKind, HEADER_LEN};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Decompressor<'a> {
    src: &'a [u8],
    dst: Vec<u8>,

    /// index of the size header
    start_index: usize,
    /// index to read from
    read_index: usize,
    /// output size announced by the header
    declared: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decompressed {
    pub data: Vec<u8>,
    /// size of the compressed block, header included
    pub bytes_read: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompressError {
    #[error("Compressed data ended unexpectedly at {position:#x}")]
    UnexpectedEnd { position: usize },
    #[error("Backref reaches {offset} bytes back but only {available} bytes were produced")]
    BackrefOutOfRange { offset: usize, available: usize },
    #[error("Operation would produce {produced} bytes but the block declares {declared}")]
    Overrun { declared: usize, produced: usize },
    #[error("Invalid Data")]
    InvalidData,
}

impl<'a> Decompressor<'a> {
    /// Prepare to decode the framed block starting at `offset` of `src`.
    pub fn new(src: &'a [u8], offset: usize) -> Self {
        Self {
            src,
            dst: Vec::new(),

            start_index: offset,
            read_index: offset,
            declared: 0,
        }
    }

    /// Decode a single, already encoded operation on top of `history`.
    ///
    /// Returns the extended output and the number of bytes of `src` consumed.
    pub(crate) fn replay(
        src: &'a [u8],
        history: Vec<u8>,
        declared: usize,
    ) -> Result<(Vec<u8>, usize), DecompressError> {
        let mut decompressor = Self {
            src,
            dst: history,

            start_index: 0,
            read_index: 0,
            declared,
        };

        decompressor.step()?;

        Ok((decompressor.dst, decompressor.read_index))
    }

    pub fn decompress(mut self) -> Result<Decompressed, DecompressError> {
        let block = self
            .src
            .get(self.start_index..)
            .ok_or(DecompressError::UnexpectedEnd {
                position: self.start_index,
            })?;

        let (declared, _) = unframe(block).map_err(|_| DecompressError::UnexpectedEnd {
            position: self.src.len(),
        })?;

        self.declared = declared as usize;
        self.read_index = self.start_index + HEADER_LEN;
        self.dst.reserve_exact(self.declared);

        while self.dst.len() < self.declared {
            self.step()?;
        }

        Ok(Decompressed {
            data: self.dst,
            bytes_read: self.read_index - self.start_index,
        })
    }

    fn step(&mut self) -> Result<(), DecompressError> {
        let control = ControlByte::parse(self.read()?);
        log::trace!("operation: {:?}", control);

        let produced = self.dst.len() + control.decoded_len();
        if produced > self.declared {
            return Err(DecompressError::Overrun {
                declared: self.declared,
                produced,
            });
        }

        match control.kind {
            OpKind::Backref => {
                let low = self.read()?;
                self.copy_backref(control.count, control.backref_offset(low))
            }
            OpKind::RlePairs => self.copy_interleaved(control.count),
            OpKind::RlePattern => self.repeat_pattern(control.count),
            OpKind::RleSingle => self.repeat_value(control.count),
            OpKind::Literal => self.copy_simple(control.count),
        }
    }

    fn read(&mut self) -> Result<u8, DecompressError> {
        let value = *self
            .src
            .get(self.read_index)
            .ok_or(DecompressError::UnexpectedEnd {
                position: self.read_index,
            })?;
        self.read_index += 1;

        Ok(value)
    }

    fn copy_simple(&mut self, count: usize) -> Result<(), DecompressError> {
        for _ in 0..count {
            let value = self.read()?;
            self.dst.push(value);
        }

        Ok(())
    }

    fn copy_backref(&mut self, count: usize, offset: usize) -> Result<(), DecompressError> {
        if offset > self.dst.len() {
            return Err(DecompressError::BackrefOutOfRange {
                offset,
                available: self.dst.len(),
            });
        }

        // byte by byte, so a short offset keeps feeding on what this copy just produced
        for _ in 0..count {
            self.dst.push(self.dst[self.dst.len() - offset]);
        }

        Ok(())
    }

    fn copy_interleaved(&mut self, count: usize) -> Result<(), DecompressError> {
        let fixed_value = self.read()?;

        for _ in 0..count {
            self.dst.push(fixed_value);

            let read = self.read()?;
            self.dst.push(read);
        }

        Ok(())
    }

    fn repeat_pattern(&mut self, count: usize) -> Result<(), DecompressError> {
        let first = self.read()?;
        let second = self.read()?;

        for _ in 0..count {
            self.dst.push(first);
            self.dst.push(second);
        }

        Ok(())
    }

    fn repeat_value(&mut self, count: usize) -> Result<(), DecompressError> {
        let value = self.read()?;

        for _ in 0..count {
            self.dst.push(value);
        }

        Ok(())
    }
}

/// Decode a framed block that starts at the beginning of `bytes`.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, DecompressError> {
    Decompressor::new(bytes, 0)
        .decompress()
        .map(|decompressed| decompressed.data)
}
