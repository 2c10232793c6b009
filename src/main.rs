use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use epsilon::{Compressable, PaletteCollection, Rom, RomMap, TileSet, BW_PALETTE};
use std::{fs, path::PathBuf};

#[derive(Parser, Debug)]
struct Arguments {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract every compressed block listed in a ROM map
    Extract {
        rom: PathBuf,

        #[command(flatten)]
        map: MapArgs,

        #[command(flatten)]
        args: ExtractArgs,
    },

    /// Decompress a single block from a ROM or a standalone file
    Decompress {
        input: PathBuf,

        /// Offset of the block's size header inside the input
        #[arg(long, value_parser = parse_offset, default_value = "0")]
        offset: usize,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Compress raw tile data into a framed block
    Compress {
        input: PathBuf,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Compress raw tile data and write it over an existing block of a ROM
    Insert {
        rom: PathBuf,

        /// Offset of the block that is replaced
        #[arg(long, value_parser = parse_offset)]
        offset: usize,

        /// Raw tile data to compress
        input: PathBuf,

        /// Where to write the patched ROM
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Check that every listed block survives a decompress, compress, decompress cycle
    /// and still fits into its original space
    Verify {
        rom: PathBuf,

        #[command(flatten)]
        map: MapArgs,
    },

    /// Render raw tile data to a PNG sheet
    Render {
        input: PathBuf,

        #[arg(short, long)]
        out: PathBuf,

        /// Tiles per row
        #[arg(short, long, default_value = "16")]
        columns: u32,

        /// Raw CRAM palette data, a grey ramp is used if omitted
        #[arg(short, long)]
        palette: Option<PathBuf>,

        /// Which of the palettes in the palette file to use
        #[arg(long, default_value = "0")]
        palette_index: usize,

        /// Scale factor of the output image
        #[arg(short, long, default_value = "4")]
        scale: u32,
    },
}

#[derive(Args, Debug, Clone)]
struct MapArgs {
    /// ROM map (.toml) or plain list of hex offsets that locates the compressed blocks
    #[arg(short = 'm', long)]
    map: PathBuf,
}

impl MapArgs {
    fn load(&self, rom: &Rom) -> anyhow::Result<RomMap> {
        let map = RomMap::load(&self.map)
            .with_context(|| format!("Failed to load ROM map {}", self.map.display()))?;

        match map.metadata_for(rom) {
            Some(metadata) => log::info!(
                "Loaded ROM: '{}' with CRC: {:#010x}",
                metadata.name,
                metadata.crc
            ),
            None if map.is_compatible_with(rom) => log::info!(
                "Loaded ROM: '{}' with CRC: {:#010x}",
                rom.title().unwrap_or_default(),
                rom.crc()
            ),
            None => log::warn!("ROM map is not compatible with the supplied ROM. Continuing anyway."),
        }

        Ok(map)
    }
}

#[derive(Args, Debug, Clone)]
struct ExtractArgs {
    /// The output directory to write the decompressed blocks to
    #[arg(short, long, default_value = "data")]
    out_dir: PathBuf,

    /// Overwrite the output directory if it already exists
    #[arg(long)]
    force: bool,
}

fn parse_offset(value: &str) -> Result<usize, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .or_else(|| value.strip_prefix('$'));

    let parsed = match digits {
        Some(digits) => usize::from_str_radix(digits, 16),
        None => value.parse(),
    };

    parsed.map_err(|err| format!("invalid offset '{}': {}", value, err))
}

fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();
    colog::init();

    match args.command {
        Commands::Extract { rom, map, args } => extract(rom, map, args)?,
        Commands::Decompress { input, offset, out } => decompress(input, offset, out)?,
        Commands::Compress { input, out } => compress(input, out)?,
        Commands::Insert {
            rom,
            offset,
            input,
            out,
        } => insert(rom, offset, input, out)?,
        Commands::Verify { rom, map } => verify(rom, map)?,
        Commands::Render {
            input,
            out,
            columns,
            palette,
            palette_index,
            scale,
        } => render(input, out, columns, palette, palette_index, scale)?,
    }

    Ok(())
}

fn extract(rom: PathBuf, map: MapArgs, args: ExtractArgs) -> anyhow::Result<()> {
    use indicatif::{ParallelProgressIterator, ProgressBar};
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let rom = Rom::open(&rom).with_context(|| "Failed to open ROM file")?;
    let offsets = map.load(&rom)?.offsets();

    if args.force && args.out_dir.exists() {
        fs::remove_dir_all(&args.out_dir)
            .with_context(|| "Failed to clean up old extract directory")?;
    }
    fs::create_dir_all(&args.out_dir).with_context(|| "Failed to create output directory")?;

    log::info!("Extracting {} blocks...", offsets.len());

    let progress = ProgressBar::new(offsets.len() as u64);
    let failed = AtomicUsize::new(0);

    offsets
        .par_iter()
        .progress_with(progress.clone())
        .try_for_each(|&offset| -> anyhow::Result<()> {
            let block = match rom.extract(offset) {
                Ok(block) => block,
                Err(err) => {
                    progress.suspend(|| log::warn!("Skipping block: {:#}", anyhow::Error::new(err)));
                    failed.fetch_add(1, Ordering::SeqCst);
                    return Ok(());
                }
            };

            let path = args.out_dir.join(format!("tiles_{:X}.bin", offset));
            fs::write(&path, &block.data)
                .with_context(|| format!("Failed to write {}", path.display()))?;

            Ok(())
        })?;

    progress.finish_and_clear();
    log::info!(
        "Done! Extracted {} of {} blocks",
        offsets.len() - failed.load(Ordering::SeqCst),
        offsets.len()
    );

    Ok(())
}

fn decompress(input: PathBuf, offset: usize, out: PathBuf) -> anyhow::Result<()> {
    let rom = Rom::open(&input).with_context(|| "Failed to open input file")?;
    let block = rom.extract(offset)?;

    fs::write(&out, &block.data).with_context(|| "Failed to write output file")?;
    log::info!(
        "Decompressed {} bytes into {} bytes",
        block.bytes_read,
        block.data.len()
    );

    Ok(())
}

fn compress(input: PathBuf, out: PathBuf) -> anyhow::Result<()> {
    let raw = fs::read(&input).with_context(|| "Failed to read input file")?;
    let block = epsilon::compress_to_bytes(&raw)?;

    fs::write(&out, &block).with_context(|| "Failed to write output file")?;
    log::info!("Compressed {} bytes into {} bytes", raw.len(), block.len());

    Ok(())
}

fn insert(rom_path: PathBuf, offset: usize, input: PathBuf, out: PathBuf) -> anyhow::Result<()> {
    let mut rom = Rom::open(&rom_path).with_context(|| "Failed to open ROM file")?;
    let raw = fs::read(&input).with_context(|| "Failed to read input file")?;

    let written = rom.insert(offset, &raw)?;
    rom.save(&out).with_context(|| "Failed to write patched ROM")?;

    log::info!("Inserted {} byte block at {:#07x}", written, offset);

    Ok(())
}

fn verify(rom: PathBuf, map: MapArgs) -> anyhow::Result<()> {
    use indicatif::{ParallelProgressIterator, ProgressBar};
    use rayon::prelude::*;

    let rom = Rom::open(&rom).with_context(|| "Failed to open ROM file")?;
    let offsets = map.load(&rom)?.offsets();

    log::info!("Verifying {} blocks...", offsets.len());

    let progress = ProgressBar::new(offsets.len() as u64);
    let problems = offsets
        .par_iter()
        .progress_with(progress.clone())
        .filter_map(|&offset| {
            let result = verify_block(&rom, offset);
            if let Err(err) = &result {
                progress.suspend(|| log::warn!("{:#07x}: {:#}", offset, err));
            }
            result.err()
        })
        .count();

    progress.finish_and_clear();

    if problems > 0 {
        anyhow::bail!("{} of {} blocks failed verification", problems, offsets.len());
    }

    log::info!("Done! All {} blocks verified", offsets.len());
    Ok(())
}

fn verify_block(rom: &Rom, offset: usize) -> anyhow::Result<()> {
    let original = rom.extract(offset)?;
    let block = epsilon::compress_to_bytes(&original.data)?;
    let roundtrip = epsilon::decompress(&block)?;

    if roundtrip != original.data {
        anyhow::bail!("recompressed block does not decode to the original data");
    }

    if block.len() > original.bytes_read {
        anyhow::bail!(
            "recompressed block grew from {} to {} bytes",
            original.bytes_read,
            block.len()
        );
    }

    log::debug!(
        "{:#07x}: {} -> {} bytes",
        offset,
        original.bytes_read,
        block.len()
    );

    Ok(())
}

fn render(
    input: PathBuf,
    out: PathBuf,
    columns: u32,
    palette: Option<PathBuf>,
    palette_index: usize,
    scale: u32,
) -> anyhow::Result<()> {
    let data = fs::read(&input).with_context(|| "Failed to read tile data")?;
    let tiles = TileSet::try_from_slice(&data)
        .with_context(|| "Tile data must be a non empty multiple of 32 bytes")?;

    let palette = match palette {
        Some(path) => {
            let data = fs::read(&path).with_context(|| "Failed to read palette data")?;
            let palettes = PaletteCollection::try_from_slice(&data)
                .with_context(|| "Palette data must hold one to four 32 byte palettes")?;

            palettes
                .get(palette_index)
                .with_context(|| format!("Palette file has no palette {}", palette_index))?
                .clone()
        }
        None => BW_PALETTE,
    };

    let img = tiles.to_image(columns, &palette);
    let scale = scale.max(1);
    let img = image::imageops::resize(
        &img,
        img.width() * scale,
        img.height() * scale,
        image::imageops::FilterType::Nearest,
    );

    img.save(&out).with_context(|| "Failed to save image")?;
    log::info!(
        "Rendered {} tiles to {}",
        tiles.tiles().len(),
        out.display()
    );

    Ok(())
}
