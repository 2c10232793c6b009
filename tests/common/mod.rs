//! Deterministic test buffers.

#![allow(dead_code)]

const COLORS: [u8; 4] = [0x0, 0x1, 0x7, 0xf];

/// Tile-like data: rows of four bytes drawn from a few colours, some rows
/// repeated, with runs of colour 0 in between. The same `seed` always gives
/// the same buffer.
pub fn tile_sheet(len: usize, seed: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(len);
    let mut row_index = seed;

    while data.len() < len {
        let row: Vec<u8> = (0..4)
            .map(|x| {
                let hi = COLORS[(row_index * 3 + x) % 4];
                let lo = COLORS[(row_index / 3 + x * x) % 4];
                hi << 4 | lo
            })
            .collect();

        for _ in 0..1 + row_index % 3 {
            data.extend_from_slice(&row);
        }

        if row_index % 5 == 0 {
            data.extend(std::iter::repeat(0).take(row_index % 40));
        }

        row_index += 1;
    }

    data.truncate(len);
    data
}

/// Counting bytes. Nothing repeats within 256 bytes, so there is nothing to compress.
pub fn ascending(len: usize) -> Vec<u8> {
    (0..len).map(|index| index as u8).collect()
}
