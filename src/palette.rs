use crate::Compressable;
use image::Rgb;

/// Size of one 16 colour palette in CRAM format.
const PALETTE_SIZE: usize = 32;
/// The VDP holds four palettes.
const MAX_PALETTES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette([Rgb<u8>; 16]);

#[derive(Debug, Clone)]
pub struct PaletteCollection(Vec<Palette>);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorIndex(u8);

/// Grey ramp for looking at tiles without knowing their palette.
pub const BW_PALETTE: Palette = {
    let mut colors = [Rgb([0, 0, 0]); 16];
    let mut i = 0;
    while i < 16 {
        let level = i as u8 * 17;
        colors[i] = Rgb([level, level, level]);
        i += 1;
    }
    Palette(colors)
};

impl ColorIndex {
    pub const fn new(index: u8) -> Self {
        assert!(index < 16, "ColorIndex must be less than 16");

        ColorIndex(index)
    }

    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    pub const fn is_transparent(&self) -> bool {
        self.0 == 0
    }
}

impl PaletteCollection {
    pub fn get(&self, index: usize) -> Option<&Palette> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Compressable for PaletteCollection {
    /// Convert one to four CRAM palettes.
    fn try_from_slice(data: &[u8]) -> Option<Self> {
        if data.is_empty()
            || data.len() % PALETTE_SIZE != 0
            || data.len() > PALETTE_SIZE * MAX_PALETTES
        {
            return None;
        }

        let palettes = data
            .chunks_exact(PALETTE_SIZE)
            .map(Palette::from_slice)
            .collect::<Vec<_>>();

        Some(PaletteCollection(palettes))
    }
}

impl Palette {
    /// Convert 16 big-endian CRAM words (`0000BBB0GGG0RRR0`) into a palette.
    pub fn from_slice(data: &[u8]) -> Self {
        assert!(data.len() == PALETTE_SIZE, "Palette data must be 32 bytes long");

        let mut palette = [Rgb([0, 0, 0]); 16];
        for (i, color) in data.chunks_exact(2).enumerate() {
            let word = u16::from_be_bytes([color[0], color[1]]);
            let r = expand_channel(word >> 1);
            let g = expand_channel(word >> 5);
            let b = expand_channel(word >> 9);

            palette[i] = Rgb([r, g, b]);
        }
        Palette(palette)
    }

    pub const fn get(&self, index: ColorIndex) -> Rgb<u8> {
        self.0[index.0 as usize]
    }
}

/// Stretch a 3 bit channel over the full byte range.
fn expand_channel(value: u16) -> u8 {
    let value = (value & 0x07) as u8;
    value << 5 | value << 2 | value >> 1
}
