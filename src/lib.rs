mod compression;
pub use compression::{
    compress, compress_to_bytes, decompress, frame, unframe, Compressable, CompressError,
    CompressedBlock, Compressor, ControlByte, DecompressError, Decompressed, Decompressor,
    OpKind, Operation, OperationError, HEADER_LEN, MAX_COUNT, MAX_DECODED_LEN, MAX_LITERAL,
    MAX_OFFSET,
};

mod palette;
pub use palette::{ColorIndex, Palette, PaletteCollection, BW_PALETTE};

mod rom;
pub use rom::{MapError, Rom, RomError, RomMap, RomMetadata, TileEntry};

mod tile;
pub use tile::{Tile, TileSet, TILE_SIZE};
