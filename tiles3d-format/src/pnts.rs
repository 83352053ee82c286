//https://github.com/CesiumGS/3d-tiles/blob/main/specification/TileFormats/PointCloud/README.adoc

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde_json::Value;
use std::io::Cursor;

use crate::chunk::{check_magic, parse_json_chunk, slice_chunk, write_metadata_chunks};
use crate::{Error, Result};

pub const PNTS_MAGIC: &[u8; 4] = b"pnts";
pub const PNTS_VERSION: u32 = 1;

const HEADER_BYTE_LENGTH: usize = 28;

/// A Point Cloud tile. There is no geometry payload chunk; the points live
/// in the feature table's binary attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Pnts {
    pub feature_table_json: Value,
    pub feature_table_binary: Vec<u8>,
    pub batch_table_json: Option<Value>,
    pub batch_table_binary: Vec<u8>,
}

impl Pnts {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let chunks = write_metadata_chunks(
            HEADER_BYTE_LENGTH,
            Some(&self.feature_table_json),
            &self.feature_table_binary,
            self.batch_table_json.as_ref(),
            &self.batch_table_binary,
        )?;
        let byte_length = HEADER_BYTE_LENGTH + chunks.bytes.len();
        let mut tile = Vec::with_capacity(byte_length);
        tile.extend_from_slice(PNTS_MAGIC);
        tile.write_u32::<LittleEndian>(PNTS_VERSION)?;
        tile.write_u32::<LittleEndian>(byte_length as u32)?;
        tile.write_u32::<LittleEndian>(chunks.feature_table_json_byte_length)?;
        tile.write_u32::<LittleEndian>(chunks.feature_table_binary_byte_length)?;
        tile.write_u32::<LittleEndian>(chunks.batch_table_json_byte_length)?;
        tile.write_u32::<LittleEndian>(chunks.batch_table_binary_byte_length)?;
        tile.extend_from_slice(&chunks.bytes);
        return Ok(tile);
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        check_magic(PNTS_MAGIC, data)?;
        if data.len() < HEADER_BYTE_LENGTH {
            return Err(Error::Truncated {
                magic: "pnts",
                declared: HEADER_BYTE_LENGTH,
                actual: data.len(),
            });
        }
        let mut header = Cursor::new(&data[4..HEADER_BYTE_LENGTH]);
        let version = header.read_u32::<LittleEndian>()?;
        if version != PNTS_VERSION {
            return Err(Error::UnsupportedVersion {
                magic: "pnts",
                version,
            });
        }
        let byte_length = header.read_u32::<LittleEndian>()? as usize;
        if byte_length > data.len() {
            return Err(Error::Truncated {
                magic: "pnts",
                declared: byte_length,
                actual: data.len(),
            });
        }
        let feature_table_json_byte_length = header.read_u32::<LittleEndian>()? as usize;
        let feature_table_binary_byte_length = header.read_u32::<LittleEndian>()? as usize;
        let batch_table_json_byte_length = header.read_u32::<LittleEndian>()? as usize;
        let batch_table_binary_byte_length = header.read_u32::<LittleEndian>()? as usize;

        let mut offset = HEADER_BYTE_LENGTH;
        let feature_table_json =
            parse_json_chunk(slice_chunk("pnts", data, &mut offset, feature_table_json_byte_length)?)?
                .unwrap_or(Value::Null);
        let feature_table_binary =
            slice_chunk("pnts", data, &mut offset, feature_table_binary_byte_length)?.to_vec();
        let batch_table_json =
            parse_json_chunk(slice_chunk("pnts", data, &mut offset, batch_table_json_byte_length)?)?;
        let batch_table_binary =
            slice_chunk("pnts", data, &mut offset, batch_table_binary_byte_length)?.to_vec();
        return Ok(Self {
            feature_table_json,
            feature_table_binary,
            batch_table_json,
            batch_table_binary,
        });
    }
}
