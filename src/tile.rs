use crate::{palette::ColorIndex, Compressable};

use super::Palette;
use image::{imageops, Rgba, RgbaImage};

/// Mega Drive tiles are 8x8 pixels at 4bpp, two pixels per byte.
pub const TILE_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile([ColorIndex; 64]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSet(Vec<Tile>);

impl Compressable for TileSet {
    fn try_from_slice(data: &[u8]) -> Option<Self> {
        if data.is_empty() || data.len() % TILE_SIZE != 0 {
            return None;
        }

        let tiles = data
            .chunks_exact(TILE_SIZE)
            .map(Tile::from_slice)
            .collect::<Vec<_>>();

        Some(TileSet(tiles))
    }
}

impl TileSet {
    pub fn tiles(&self) -> &[Tile] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Tile> {
        self.0.get(index)
    }

    /// Lay the tiles out left to right, `columns` tiles per row.
    pub fn to_image(&self, columns: u32, palette: &Palette) -> RgbaImage {
        let columns = columns.max(1);
        let rows = (self.0.len() as u32).div_ceil(columns);

        let mut image = RgbaImage::new(columns * 8, rows * 8);

        for (i, tile) in self.0.iter().enumerate() {
            let x = (i as u32 % columns) * 8;
            let y = (i as u32 / columns) * 8;

            imageops::replace(&mut image, &tile.with_palette(palette), x.into(), y.into());
        }

        image
    }
}

impl Tile {
    pub fn data(&self) -> &[ColorIndex] {
        &self.0
    }

    /// Rows are 4 bytes wide, the left pixel of each byte sits in the upper nibble.
    pub fn from_slice(data: &[u8]) -> Self {
        assert!(data.len() == TILE_SIZE, "Tile data must be 32 bytes long");

        let mut tile = [ColorIndex::new(0); 64];

        for (i, &byte) in data.iter().enumerate() {
            tile[i * 2] = ColorIndex::new(byte >> 4);
            tile[i * 2 + 1] = ColorIndex::new(byte & 0x0f);
        }

        Tile(tile)
    }

    pub fn with_palette(&self, palette: &Palette) -> RgbaImage {
        RgbaImage::from_fn(8, 8, |x, y| {
            let pixel_index = ((y * 8) + x) as usize;
            let color_index = self.0[pixel_index];

            if color_index.is_transparent() {
                Rgba([0, 0, 0, 0])
            } else {
                let color = palette.get(color_index);
                Rgba([color[0], color[1], color[2], 255])
            }
        })
    }
}
