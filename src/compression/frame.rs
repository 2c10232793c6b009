use super::{CompressedBlock, DecompressError, OperationError};

/// The big-endian decoded length in front of every block.
pub const HEADER_LEN: usize = 2;

/// Serialize a block: size header followed by every operation in order.
pub fn frame(block: &CompressedBlock) -> Result<Vec<u8>, OperationError> {
    let mut out = Vec::with_capacity(block.encoded_len());
    out.extend_from_slice(&block.decoded_length.to_be_bytes());

    for operation in &block.operations {
        operation.encode(&mut out)?;
    }

    Ok(out)
}

/// Split a framed block into its declared decoded length and the operation stream.
///
/// The operation stream is returned as is, it may run past the end of the block
/// when `bytes` is a slice into a larger image.
pub fn unframe(bytes: &[u8]) -> Result<(u16, &[u8]), DecompressError> {
    match bytes {
        [high, low, rest @ ..] => Ok((u16::from_be_bytes([*high, *low]), rest)),
        _ => Err(DecompressError::UnexpectedEnd {
            position: bytes.len(),
        }),
    }
}
