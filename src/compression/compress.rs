use super::{
    frame,
    matcher::find_best_backref,
    runs::{Runs, MIN_PAIRS, MIN_PATTERN, MIN_SINGLE},
    CompressedBlock, DecompressError, Decompressor, Operation, OperationError, MAX_LITERAL,
};
use thiserror::Error;

/// Everything but `InputTooLarge` means the compressor built a bad stream,
/// which is a bug in the compressor and never a property of the input.
#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Input is {0} bytes but the size header holds at most 65535")]
    InputTooLarge(usize),
    #[error("Internal error: invalid operation at {position:#x}")]
    InvalidOperation {
        position: usize,
        #[source]
        source: OperationError,
    },
    #[error("Internal error: {operation:?} at {position:#x} does not decode")]
    SelfCheckDecode {
        position: usize,
        operation: Operation,
        #[source]
        source: DecompressError,
    },
    #[error("Internal error: {operation:?} at {position:#x} does not reproduce the input")]
    SelfCheckFailed {
        position: usize,
        operation: Operation,
    },
    #[error("Internal error: compressed block does not frame")]
    Frame(#[source] OperationError),
}

/// Greedy single pass compressor.
///
/// Every committed operation is encoded and decoded again on top of the output
/// produced so far, so a returned block always round-trips.
#[derive(Debug)]
pub struct Compressor<'a> {
    raw: &'a [u8],
    decoded_length: u16,

    cursor: usize,
    /// bytes that matched no pattern yet, flushed as one literal
    pending: Vec<u8>,
    /// output of decoding every committed operation
    replay: Vec<u8>,
    /// encoded form of the operation being checked
    scratch: Vec<u8>,

    operations: Vec<Operation>,
}

impl<'a> Compressor<'a> {
    pub fn new(raw: &'a [u8]) -> Result<Self, CompressError> {
        let decoded_length =
            u16::try_from(raw.len()).map_err(|_| CompressError::InputTooLarge(raw.len()))?;

        Ok(Self {
            raw,
            decoded_length,

            cursor: 0,
            pending: Vec::with_capacity(MAX_LITERAL),
            replay: Vec::with_capacity(raw.len()),
            scratch: Vec::new(),

            operations: Vec::new(),
        })
    }

    pub fn compress(mut self) -> Result<CompressedBlock, CompressError> {
        while self.cursor < self.raw.len() {
            match self.best_candidate() {
                Some(operation) => {
                    self.flush_literal()?;

                    let len = operation.decoded_len();
                    self.emit(operation)?;
                    self.cursor += len;
                }
                None => {
                    self.pending.push(self.raw[self.cursor]);
                    self.cursor += 1;

                    if self.pending.len() == MAX_LITERAL {
                        self.flush_literal()?;
                    }
                }
            }
        }

        self.flush_literal()?;

        let block = CompressedBlock {
            decoded_length: self.decoded_length,
            operations: self.operations,
        };

        log::debug!(
            "compressed {} bytes into {} operations ({} bytes)",
            self.raw.len(),
            block.operations.len(),
            block.encoded_len()
        );

        Ok(block)
    }

    /// Best pattern operation at the cursor, `None` if a literal byte is the best we can do.
    ///
    /// Ranked by output bytes per encoded byte. Ties go to the earlier kind in
    /// backref, pairs, pattern, single order.
    fn best_candidate(&self) -> Option<Operation> {
        let raw = self.raw;
        let cursor = self.cursor;
        let runs = Runs::probe(raw, cursor);

        let backref = find_best_backref(raw, cursor)
            .map(|found| Operation::Backref {
                length: found.length,
                offset: found.offset,
            });

        let pairs = (runs.pairs >= MIN_PAIRS).then(|| Operation::RlePairs {
            fixed: raw[cursor],
            values: raw[cursor + 1..]
                .iter()
                .step_by(2)
                .take(runs.pairs)
                .copied()
                .collect(),
        });

        let pattern = (runs.pattern >= MIN_PATTERN).then(|| Operation::RlePattern {
            count: runs.pattern,
            pattern: [raw[cursor], raw[cursor + 1]],
        });

        let single = (runs.single >= MIN_SINGLE).then(|| Operation::RleSingle {
            count: runs.single,
            value: raw[cursor],
        });

        [backref, pairs, pattern, single]
            .into_iter()
            .flatten()
            .reduce(|best, candidate| {
                if compresses_better(&candidate, &best) {
                    candidate
                } else {
                    best
                }
            })
    }

    fn flush_literal(&mut self) -> Result<(), CompressError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let bytes = std::mem::replace(&mut self.pending, Vec::with_capacity(MAX_LITERAL));
        self.emit(Operation::Literal(bytes))
    }

    /// Encode `operation`, decode it on top of the replayed output and compare
    /// against the input before committing it.
    fn emit(&mut self, operation: Operation) -> Result<(), CompressError> {
        let position = self.replay.len();

        self.scratch.clear();
        if let Err(source) = operation.encode(&mut self.scratch) {
            return Err(CompressError::InvalidOperation { position, source });
        }

        let end = position + operation.decoded_len();
        let history = std::mem::take(&mut self.replay);

        let (replay, consumed) = match Decompressor::replay(&self.scratch, history, end) {
            Ok(result) => result,
            Err(source) => {
                return Err(CompressError::SelfCheckDecode {
                    position,
                    operation,
                    source,
                })
            }
        };

        if consumed != self.scratch.len()
            || replay.len() != end
            || self.raw.get(position..end) != Some(&replay[position..])
        {
            return Err(CompressError::SelfCheckFailed {
                position,
                operation,
            });
        }

        log::trace!("operation at {:#x}: {:?}", position, operation);

        self.replay = replay;
        self.operations.push(operation);

        Ok(())
    }
}

fn compresses_better(candidate: &Operation, best: &Operation) -> bool {
    candidate.decoded_len() * best.encoded_len() > best.decoded_len() * candidate.encoded_len()
}

/// Compress raw bytes into a block of operations.
pub fn compress(raw: &[u8]) -> Result<CompressedBlock, CompressError> {
    Compressor::new(raw)?.compress()
}

/// Compress raw bytes into a framed block, ready to be written into an image.
pub fn compress_to_bytes(raw: &[u8]) -> Result<Vec<u8>, CompressError> {
    let block = compress(raw)?;

    frame(&block).map_err(CompressError::Frame)
}
