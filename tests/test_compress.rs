mod common;

use common::tile_sheet;
use epsilon::{
    compress, compress_to_bytes, decompress, frame, CompressError, CompressedBlock, Operation,
    OperationError, MAX_COUNT, MAX_DECODED_LEN, MAX_LITERAL, MAX_OFFSET,
};
use proptest::prelude::*;
use std::ops::Range;

/// Compress, check the stream limits, decode and compare.
fn roundtrip(raw: &[u8]) -> anyhow::Result<CompressedBlock> {
    let block = compress(raw)?;
    assert_eq!(block.decoded_length as usize, raw.len());

    let mut position = 0;
    for operation in &block.operations {
        operation.validate()?;

        if let Operation::Backref { offset, .. } = operation {
            assert!(*offset <= MAX_OFFSET);
            assert!(*offset <= position, "backref before block start at {}", position);
        }

        position += operation.decoded_len();
    }
    assert_eq!(position, raw.len());

    let bytes = block.to_bytes()?;
    assert_eq!(bytes.len(), block.encoded_len());
    assert_eq!(decompress(&bytes)?, raw);

    Ok(block)
}

#[test]
fn test_single_run() -> anyhow::Result<()> {
    let block = roundtrip(&[0xff; 5])?;
    assert_eq!(
        block.operations,
        [Operation::RleSingle {
            count: 5,
            value: 0xff
        }]
    );

    Ok(())
}

#[test]
fn test_no_repetition() -> anyhow::Result<()> {
    let block = roundtrip(&[0x01, 0x02, 0x03, 0x04])?;
    assert_eq!(
        block.operations,
        [Operation::Literal(vec![0x01, 0x02, 0x03, 0x04])]
    );

    Ok(())
}

#[test]
fn test_pattern_run() -> anyhow::Result<()> {
    let raw = [0xaa, 0xbb].repeat(20);
    let block = roundtrip(&raw)?;
    assert_eq!(
        block.operations,
        [Operation::RlePattern {
            count: 20,
            pattern: [0xaa, 0xbb]
        }]
    );

    Ok(())
}

#[test]
fn test_pattern_run_over_count_limit() -> anyhow::Result<()> {
    let raw = [0xaa, 0xbb].repeat(40);
    let block = roundtrip(&raw)?;

    assert_eq!(block.operations.len(), 2);
    assert_eq!(
        block.operations[0],
        Operation::RlePattern {
            count: 32,
            pattern: [0xaa, 0xbb]
        }
    );
    // the remaining 8 repetitions are cheaper as a copy of what came before
    assert_eq!(
        block.operations[1],
        Operation::Backref {
            length: 16,
            offset: 2
        }
    );

    Ok(())
}

#[test]
fn test_backref() -> anyhow::Result<()> {
    let raw = b"ABCDEFGHIJxyzABCDEFGHIJ";
    let block = roundtrip(raw)?;

    assert_eq!(
        block.operations,
        [
            Operation::Literal(b"ABCDEFGHIJxyz".to_vec()),
            Operation::Backref {
                length: 10,
                offset: 13
            },
        ]
    );

    Ok(())
}

#[test]
fn test_interleaved_pairs() -> anyhow::Result<()> {
    let block = roundtrip(&[0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04])?;
    assert_eq!(
        block.operations,
        [Operation::RlePairs {
            fixed: 0x00,
            values: vec![0x01, 0x02, 0x03, 0x04]
        }]
    );

    Ok(())
}

#[test]
fn test_literal_runs_are_split() -> anyhow::Result<()> {
    let raw = (0..40).collect::<Vec<u8>>();
    let block = roundtrip(&raw)?;

    assert_eq!(
        block.operations,
        [
            Operation::Literal(raw[..MAX_LITERAL].to_vec()),
            Operation::Literal(raw[MAX_LITERAL..].to_vec()),
        ]
    );

    Ok(())
}

#[test]
fn test_long_run_uses_overlapping_copy() -> anyhow::Result<()> {
    let block = roundtrip(&[0x00; 100])?;

    // a zero pair pattern covers twice what a single byte run can
    assert_eq!(
        block.operations[0],
        Operation::RlePattern {
            count: MAX_COUNT,
            pattern: [0x00, 0x00]
        }
    );
    assert!(block.operations[1..]
        .iter()
        .all(|operation| matches!(operation, Operation::Backref { offset: 1, .. })));

    Ok(())
}

#[test]
fn test_empty_input() -> anyhow::Result<()> {
    let block = roundtrip(&[])?;
    assert!(block.operations.is_empty());
    assert_eq!(compress_to_bytes(&[])?, [0x00, 0x00]);

    Ok(())
}

#[test]
fn test_roundtrip_tiles() -> anyhow::Result<()> {
    for seed in 0..8 {
        let raw = tile_sheet(4096, seed);
        let block = roundtrip(&raw)?;
        assert!(block.encoded_len() < raw.len());
    }

    Ok(())
}

#[test]
fn test_largest_input() -> anyhow::Result<()> {
    roundtrip(&tile_sheet(MAX_DECODED_LEN, 0xffff))?;

    Ok(())
}

/// Bytes from a handful of values, so runs, pairs and matches show up.
fn small_alphabet(len: Range<usize>) -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(
        prop_oneof![Just(0x00u8), Just(0x01), Just(0x11), Just(0xff)],
        len,
    )
}

/// Rows of four tile bytes, each repeated up to three times.
fn tile_rows() -> impl Strategy<Value = Vec<u8>> {
    let row = proptest::collection::vec(
        prop::sample::select(vec![0x00u8, 0x01, 0x10, 0x77, 0xf0, 0xff]),
        4,
    );

    proptest::collection::vec((row, 1..4usize), 0..512).prop_map(|rows| {
        rows.into_iter()
            .flat_map(|(row, repeat)| row.repeat(repeat))
            .collect::<Vec<u8>>()
    })
}

fn fail(err: anyhow::Error) -> TestCaseError {
    TestCaseError::fail(format!("{:#}", err))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_roundtrip_short(raw in proptest::collection::vec(any::<u8>(), 0..64)) {
        roundtrip(&raw).map_err(fail)?;
    }

    #[test]
    fn prop_roundtrip_any_bytes(raw in proptest::collection::vec(any::<u8>(), 0..5000)) {
        roundtrip(&raw).map_err(fail)?;
    }

    #[test]
    fn prop_roundtrip_small_alphabet(raw in small_alphabet(0..5000)) {
        roundtrip(&raw).map_err(fail)?;
    }

    #[test]
    fn prop_roundtrip_tile_rows(raw in tile_rows()) {
        roundtrip(&raw).map_err(fail)?;
    }

    #[test]
    fn prop_noise_stays_close_to_input_size(
        raw in proptest::collection::vec(any::<u8>(), 1000..5000)
    ) {
        let block = roundtrip(&raw).map_err(fail)?;

        // mostly literals, one control byte per 31 bytes plus the odd short match
        prop_assert!(block.encoded_len() < raw.len() + raw.len() / 8);
    }

    #[test]
    fn prop_window_edge(
        head in proptest::collection::vec(any::<u8>(), 16),
        filler in proptest::collection::vec(any::<u8>(), 2 * MAX_OFFSET),
    ) {
        // head repeats exactly MAX_OFFSET bytes later, then once more just out of reach
        let mut raw = head.clone();
        raw.extend_from_slice(&filler[..MAX_OFFSET - head.len()]);
        raw.extend_from_slice(&head);
        raw.extend_from_slice(&filler[MAX_OFFSET..2 * MAX_OFFSET + 1 - head.len()]);
        raw.extend_from_slice(&head);

        let block = roundtrip(&raw).map_err(fail)?;
        prop_assert!(block.operations.iter().any(|operation| matches!(
            operation,
            Operation::Backref {
                length: 8..=MAX_COUNT,
                offset: MAX_OFFSET
            }
        )), "expected a backref at MAX_OFFSET");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(4))]

    #[test]
    fn prop_roundtrip_up_to_largest_input(raw in small_alphabet(0..MAX_DECODED_LEN + 1)) {
        roundtrip(&raw).map_err(fail)?;
    }
}

#[test]
fn test_input_too_large() {
    let raw = vec![0; u16::MAX as usize + 1];
    assert!(matches!(
        compress(&raw),
        Err(CompressError::InputTooLarge(65536))
    ));
}

#[test]
fn test_invalid_operations() {
    assert!(matches!(
        Operation::Backref {
            length: 33,
            offset: 1
        }
        .validate(),
        Err(OperationError::CountOutOfRange { count: 33, .. })
    ));
    assert_eq!(
        Operation::Backref {
            length: 2,
            offset: 0
        }
        .validate(),
        Err(OperationError::OffsetOutOfRange(0))
    );
    assert_eq!(
        Operation::Backref {
            length: 2,
            offset: MAX_OFFSET + 1
        }
        .validate(),
        Err(OperationError::OffsetOutOfRange(MAX_OFFSET + 1))
    );
    assert!(Operation::Literal(Vec::new()).validate().is_err());
    assert!(Operation::Literal(vec![0; MAX_LITERAL + 1]).validate().is_err());
    assert!(Operation::RleSingle { count: 0, value: 1 }.validate().is_err());

    let block = CompressedBlock {
        decoded_length: 40,
        operations: vec![Operation::RleSingle {
            count: 40,
            value: 0,
        }],
    };
    assert!(frame(&block).is_err());
}

#[test]
fn test_encoded_operations() -> anyhow::Result<()> {
    let block = CompressedBlock {
        decoded_length: 0x0123,
        operations: vec![
            Operation::Literal(vec![0xaa]),
            Operation::Backref {
                length: 32,
                offset: 1024,
            },
            Operation::RlePairs {
                fixed: 0x10,
                values: vec![0x01, 0x02],
            },
            Operation::RlePattern {
                count: 1,
                pattern: [0x03, 0x04],
            },
            Operation::RleSingle {
                count: 32,
                value: 0x05,
            },
        ],
    };

    assert_eq!(
        frame(&block)?,
        [
            0x01, 0x23, //
            0x01, 0xaa, //
            0xff, 0xff, //
            0x61, 0x10, 0x01, 0x02, //
            0x40, 0x03, 0x04, //
            0x3f, 0x05,
        ]
    );

    Ok(())
}
