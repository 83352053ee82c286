//https://github.com/CesiumGS/3d-tiles/blob/main/specification/TileFormats/Composite/README.adoc

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::chunk::check_magic;
use crate::padding::pad_buffer;
use crate::{Error, Result};

pub const CMPT_MAGIC: &[u8; 4] = b"cmpt";
pub const CMPT_VERSION: u32 = 1;

const HEADER_BYTE_LENGTH: usize = 16;
// byteLength sits at the same offset in every inner tile header
const TILE_BYTE_LENGTH_OFFSET: usize = 8;

/// A Composite tile: a flat concatenation of already-encoded inner tiles
/// (b3dm, i3dm, pnts or nested cmpt). Each inner tile is padded to an
/// 8-byte boundary and its own byteLength field is rewritten to the padded
/// length before concatenation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cmpt {
    pub tiles: Vec<Vec<u8>>,
}

impl Cmpt {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body: Vec<u8> = Vec::new();
        for (index, tile) in self.tiles.iter().enumerate() {
            if tile.len() < TILE_BYTE_LENGTH_OFFSET + 4 {
                return Err(Error::InnerTileTooShort { index });
            }
            // inner tiles always start 8-aligned: the cmpt header is 16
            // bytes and every previous tile was padded
            let mut padded = pad_buffer(tile, 0);
            let padded_length = padded.len() as u32;
            LittleEndian::write_u32(
                &mut padded[TILE_BYTE_LENGTH_OFFSET..TILE_BYTE_LENGTH_OFFSET + 4],
                padded_length,
            );
            body.extend_from_slice(&padded);
        }

        let byte_length = HEADER_BYTE_LENGTH + body.len();
        let mut tile = Vec::with_capacity(byte_length);
        tile.extend_from_slice(CMPT_MAGIC);
        tile.write_u32::<LittleEndian>(CMPT_VERSION)?;
        tile.write_u32::<LittleEndian>(byte_length as u32)?;
        tile.write_u32::<LittleEndian>(self.tiles.len() as u32)?;
        tile.extend_from_slice(&body);
        return Ok(tile);
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        check_magic(CMPT_MAGIC, data)?;
        if data.len() < HEADER_BYTE_LENGTH {
            return Err(Error::Truncated {
                magic: "cmpt",
                declared: HEADER_BYTE_LENGTH,
                actual: data.len(),
            });
        }
        let mut header = Cursor::new(&data[4..HEADER_BYTE_LENGTH]);
        let version = header.read_u32::<LittleEndian>()?;
        if version != CMPT_VERSION {
            return Err(Error::UnsupportedVersion {
                magic: "cmpt",
                version,
            });
        }
        let byte_length = header.read_u32::<LittleEndian>()? as usize;
        if byte_length > data.len() {
            return Err(Error::Truncated {
                magic: "cmpt",
                declared: byte_length,
                actual: data.len(),
            });
        }
        let tiles_length = header.read_u32::<LittleEndian>()? as usize;

        let mut tiles = Vec::with_capacity(tiles_length);
        let mut offset = HEADER_BYTE_LENGTH;
        for index in 0..tiles_length {
            if offset + TILE_BYTE_LENGTH_OFFSET + 4 > byte_length {
                return Err(Error::InnerTileTooShort { index });
            }
            let inner_byte_length = LittleEndian::read_u32(
                &data[offset + TILE_BYTE_LENGTH_OFFSET..offset + TILE_BYTE_LENGTH_OFFSET + 4],
            ) as usize;
            let end = offset + inner_byte_length;
            if inner_byte_length < TILE_BYTE_LENGTH_OFFSET + 4 || end > byte_length {
                return Err(Error::Truncated {
                    magic: "cmpt",
                    declared: end,
                    actual: byte_length,
                });
            }
            tiles.push(data[offset..end].to_vec());
            offset = end;
        }
        return Ok(Self { tiles });
    }
}
