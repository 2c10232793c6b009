use serde::{
    de::{self, Visitor},
    Deserialize,
};
use std::{fs, path::Path};
use thiserror::Error;

use super::Rom;

/// The list of compressed blocks in an image, plus the images it applies to.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RomMap {
    #[serde(default)]
    pub supported_roms: Vec<RomMetadata>,

    pub tiles: Vec<TileEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RomMetadata {
    pub name: String,
    pub crc: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct TileTable {
    offset: usize,
    #[serde(default)]
    name: Option<String>,
}

/// A compressed block, written either as a bare offset or as a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileEntry {
    pub offset: usize,
    pub name: Option<String>,
}

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Failed to read ROM map")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse ROM map")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid address {text:?} on line {line}")]
    InvalidAddress { line: usize, text: String },
    #[error("ROM map lists no tile blocks")]
    NoTiles,
}

impl RomMap {
    pub fn parse(map: &str) -> Result<RomMap, MapError> {
        let map: RomMap = toml::de::from_str(map)?;
        map.non_empty()
    }

    /// Parse a plain address table: one hex offset per line, `0x` or `$` prefix
    /// optional, `#` starts a comment.
    pub fn parse_address_list(list: &str) -> Result<RomMap, MapError> {
        let mut tiles = Vec::new();

        for (index, line) in list.lines().enumerate() {
            let text = line.split('#').next().unwrap_or_default().trim();
            if text.is_empty() {
                continue;
            }

            let digits = text
                .strip_prefix("0x")
                .or_else(|| text.strip_prefix("0X"))
                .or_else(|| text.strip_prefix('$'))
                .unwrap_or(text);

            let offset =
                usize::from_str_radix(digits, 16).map_err(|_| MapError::InvalidAddress {
                    line: index + 1,
                    text: text.to_string(),
                })?;

            tiles.push(TileEntry { offset, name: None });
        }

        RomMap {
            supported_roms: Vec::new(),
            tiles,
        }
        .non_empty()
    }

    fn non_empty(self) -> Result<RomMap, MapError> {
        if self.tiles.is_empty() {
            return Err(MapError::NoTiles);
        }

        Ok(self)
    }

    /// Load a map from disk, `.toml` files are maps, everything else an address list.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RomMap, MapError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::parse(&content),
            _ => Self::parse_address_list(&content),
        }
    }

    /// A map without any listed images applies to every image.
    pub fn is_compatible_with(&self, rom: &Rom) -> bool {
        self.supported_roms.is_empty() || self.metadata_for(rom).is_some()
    }

    pub fn metadata_for(&self, rom: &Rom) -> Option<&RomMetadata> {
        let crc = rom.crc();

        self.supported_roms
            .iter()
            .find(|rom_type| rom_type.crc == crc)
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.tiles.iter().map(|tile| tile.offset).collect()
    }
}

impl<'de> Deserialize<'de> for TileEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(TileEntryVisitor)
    }
}

struct TileEntryVisitor;

impl<'de> Visitor<'de> for TileEntryVisitor {
    type Value = TileEntry;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("an offset or a table with an offset")
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let offset = usize::try_from(value).map_err(de::Error::custom)?;
        Ok(TileEntry { offset, name: None })
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let offset = usize::try_from(value)
            .map_err(|_| de::Error::invalid_value(de::Unexpected::Signed(value), &self))?;
        Ok(TileEntry { offset, name: None })
    }

    fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
    where
        A: de::MapAccess<'de>,
    {
        let table = TileTable::deserialize(de::value::MapAccessDeserializer::new(map))?;

        Ok(TileEntry {
            offset: table.offset,
            name: table.name,
        })
    }
}
