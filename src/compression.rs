use thiserror::Error;

mod compress;
mod decompress;
mod frame;
mod matcher;
mod runs;

pub use compress::{compress, compress_to_bytes, CompressError, Compressor};
pub use decompress::{decompress, DecompressError, Decompressed, Decompressor};
pub use frame::{frame, unframe, HEADER_LEN};

/// Largest count a biased 5 bit field can carry.
pub const MAX_COUNT: usize = 32;
/// Literal lengths are stored unbiased, so they top out one lower.
pub const MAX_LITERAL: usize = 31;
/// Backref offsets are 10 bits, biased by one.
pub const MAX_OFFSET: usize = 1024;
/// The size header is a single big-endian word.
pub const MAX_DECODED_LEN: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Backref,
    RlePairs,
    RlePattern,
    RleSingle,
    Literal,
}

impl OpKind {
    /// Valid semantic count range, inclusive.
    pub const fn count_range(self) -> (usize, usize) {
        match self {
            Self::Literal => (1, MAX_LITERAL),
            _ => (1, MAX_COUNT),
        }
    }
}

/// The leading byte of every operation in a compressed stream.
///
/// Layout, most significant bit first:
///
/// | pattern             | kind       | count                 |
/// |---------------------|------------|-----------------------|
/// | `1LLLLLOO OOOOOOOO` | backref    | `L + 1`, offset `O + 1` |
/// | `011CCCCC`          | rle pairs  | `C + 1`               |
/// | `010CCCCC`          | rle pattern| `C + 1`               |
/// | `001CCCCC`          | rle single | `C + 1`               |
/// | `000LLLLL`          | literal    | `L` (not biased)      |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlByte {
    pub kind: OpKind,
    pub count: usize,
    /// upper two bits of a backref offset, zero for every other kind
    pub offset_high: u8,
}

impl ControlByte {
    pub fn parse(value: u8) -> Self {
        let (kind, count) = match value {
            n @ 0x80..=0xff => (OpKind::Backref, ((n >> 2) & 0x1f) as usize + 1),
            n @ 0x60..0x80 => (OpKind::RlePairs, (n & 0x1f) as usize + 1),
            n @ 0x40..0x60 => (OpKind::RlePattern, (n & 0x1f) as usize + 1),
            n @ 0x20..0x40 => (OpKind::RleSingle, (n & 0x1f) as usize + 1),
            n @ 0x00..0x20 => (OpKind::Literal, (n & 0x1f) as usize),
        };

        let offset_high = if kind == OpKind::Backref {
            value & 0x03
        } else {
            0
        };

        Self {
            kind,
            count,
            offset_high,
        }
    }

    /// Packs the control byte back together. Counts must already be in range.
    pub fn to_byte(self) -> u8 {
        let biased = (self.count.saturating_sub(1) & 0x1f) as u8;

        match self.kind {
            OpKind::Backref => 0x80 | (biased << 2) | (self.offset_high & 0x03),
            OpKind::RlePairs => 0x60 | biased,
            OpKind::RlePattern => 0x40 | biased,
            OpKind::RleSingle => 0x20 | biased,
            OpKind::Literal => (self.count & 0x1f) as u8,
        }
    }

    /// Full backref offset given the byte following the control byte.
    pub fn backref_offset(self, low: u8) -> usize {
        ((self.offset_high as usize) << 8 | low as usize) + 1
    }

    /// Number of output bytes this operation produces.
    pub fn decoded_len(self) -> usize {
        match self.kind {
            OpKind::RlePairs | OpKind::RlePattern => self.count * 2,
            _ => self.count,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("{kind:?} count {count} is outside of {min}..={max}")]
    CountOutOfRange {
        kind: OpKind,
        count: usize,
        min: usize,
        max: usize,
    },
    #[error("Backref offset {0} is outside of 1..=1024")]
    OffsetOutOfRange(usize),
}

/// A single decoded stream operation with its inline payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Copy `length` bytes starting `offset` bytes behind the output cursor, one byte at a time.
    Backref { length: usize, offset: usize },
    /// `fixed` interleaved with each of `values`: `fixed v0 fixed v1 ...`
    RlePairs { fixed: u8, values: Vec<u8> },
    /// `pattern` repeated `count` times.
    RlePattern { count: usize, pattern: [u8; 2] },
    /// `value` repeated `count` times.
    RleSingle { count: usize, value: u8 },
    Literal(Vec<u8>),
}

impl Operation {
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Backref { .. } => OpKind::Backref,
            Self::RlePairs { .. } => OpKind::RlePairs,
            Self::RlePattern { .. } => OpKind::RlePattern,
            Self::RleSingle { .. } => OpKind::RleSingle,
            Self::Literal(_) => OpKind::Literal,
        }
    }

    /// The value stored (after biasing) in the control byte.
    pub fn count(&self) -> usize {
        match self {
            Self::Backref { length, .. } => *length,
            Self::RlePairs { values, .. } => values.len(),
            Self::RlePattern { count, .. } | Self::RleSingle { count, .. } => *count,
            Self::Literal(bytes) => bytes.len(),
        }
    }

    pub fn decoded_len(&self) -> usize {
        match self {
            Self::RlePairs { .. } | Self::RlePattern { .. } => self.count() * 2,
            _ => self.count(),
        }
    }

    /// Size of the operation on the wire, control byte included.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Backref { .. } => 2,
            Self::RlePairs { values, .. } => 2 + values.len(),
            Self::RlePattern { .. } => 3,
            Self::RleSingle { .. } => 2,
            Self::Literal(bytes) => 1 + bytes.len(),
        }
    }

    pub fn validate(&self) -> Result<(), OperationError> {
        let kind = self.kind();
        let count = self.count();
        let (min, max) = kind.count_range();

        if !(min..=max).contains(&count) {
            return Err(OperationError::CountOutOfRange {
                kind,
                count,
                min,
                max,
            });
        }

        if let Self::Backref { offset, .. } = self {
            if !(1..=MAX_OFFSET).contains(offset) {
                return Err(OperationError::OffsetOutOfRange(*offset));
            }
        }

        Ok(())
    }

    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), OperationError> {
        self.validate()?;

        let mut control = ControlByte {
            kind: self.kind(),
            count: self.count(),
            offset_high: 0,
        };

        match self {
            Self::Backref { offset, .. } => {
                let [high, low] = ((offset - 1) as u16).to_be_bytes();
                control.offset_high = high;
                buf.push(control.to_byte());
                buf.push(low);
            }
            Self::RlePairs { fixed, values } => {
                buf.push(control.to_byte());
                buf.push(*fixed);
                buf.extend_from_slice(values);
            }
            Self::RlePattern { pattern, .. } => {
                buf.push(control.to_byte());
                buf.extend_from_slice(pattern);
            }
            Self::RleSingle { value, .. } => {
                buf.push(control.to_byte());
                buf.push(*value);
            }
            Self::Literal(bytes) => {
                buf.push(control.to_byte());
                buf.extend_from_slice(bytes);
            }
        }

        Ok(())
    }
}

/// A block as produced by the compressor, before framing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressedBlock {
    pub decoded_length: u16,
    pub operations: Vec<Operation>,
}

impl CompressedBlock {
    /// Framed size in bytes, header included.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + self
                .operations
                .iter()
                .map(Operation::encoded_len)
                .sum::<usize>()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, OperationError> {
        frame(self)
    }
}

/// Data that is stored compressed inside a cartridge image.
pub trait Compressable: Sized {
    /// Convert decompressed bytes, returns `None` if the data has the wrong shape.
    fn try_from_slice(data: &[u8]) -> Option<Self>;

    fn from_compressed(src: &[u8], offset: usize) -> Result<Self, DecompressError> {
        let decompressed = Decompressor::new(src, offset).decompress()?;
        Self::try_from_slice(&decompressed.data).ok_or(DecompressError::InvalidData)
    }
}
