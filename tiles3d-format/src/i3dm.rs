//https://github.com/CesiumGS/3d-tiles/blob/main/specification/TileFormats/Instanced3DModel/README.adoc

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde_json::Value;
use std::io::Cursor;

use crate::chunk::{check_magic, parse_json_chunk, slice_chunk, write_metadata_chunks};
use crate::{Error, Result};

pub const I3DM_MAGIC: &[u8; 4] = b"i3dm";
pub const I3DM_VERSION: u32 = 1;

const HEADER_BYTE_LENGTH: usize = 32;

/// The instanced glTF payload, either embedded in the tile or referenced
/// by URI. The header's gltfFormat field is 1 for embedded, 0 for a URI.
#[derive(Debug, Clone, PartialEq)]
pub enum GltfPayload {
    Uri(String),
    Binary(Vec<u8>),
}

/// An Instanced 3D Model tile: one glTF instanced at the positions the
/// feature table describes.
#[derive(Debug, Clone, PartialEq)]
pub struct I3dm {
    pub feature_table_json: Value,
    pub feature_table_binary: Vec<u8>,
    pub batch_table_json: Option<Value>,
    pub batch_table_binary: Vec<u8>,
    pub payload: GltfPayload,
}

impl I3dm {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let chunks = write_metadata_chunks(
            HEADER_BYTE_LENGTH,
            Some(&self.feature_table_json),
            &self.feature_table_binary,
            self.batch_table_json.as_ref(),
            &self.batch_table_binary,
        )?;
        // External URIs use forward slashes regardless of platform.
        let normalized;
        let (gltf_format, payload): (u32, &[u8]) = match &self.payload {
            GltfPayload::Uri(uri) => {
                normalized = uri.replace('\\', "/");
                (0, normalized.as_bytes())
            }
            GltfPayload::Binary(glb) => (1, glb),
        };

        let byte_length = HEADER_BYTE_LENGTH + chunks.bytes.len() + payload.len();
        let mut tile = Vec::with_capacity(byte_length);
        tile.extend_from_slice(I3DM_MAGIC);
        tile.write_u32::<LittleEndian>(I3DM_VERSION)?;
        tile.write_u32::<LittleEndian>(byte_length as u32)?;
        tile.write_u32::<LittleEndian>(chunks.feature_table_json_byte_length)?;
        tile.write_u32::<LittleEndian>(chunks.feature_table_binary_byte_length)?;
        tile.write_u32::<LittleEndian>(chunks.batch_table_json_byte_length)?;
        tile.write_u32::<LittleEndian>(chunks.batch_table_binary_byte_length)?;
        tile.write_u32::<LittleEndian>(gltf_format)?;
        tile.extend_from_slice(&chunks.bytes);
        tile.extend_from_slice(payload);
        return Ok(tile);
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        check_magic(I3DM_MAGIC, data)?;
        if data.len() < HEADER_BYTE_LENGTH {
            return Err(Error::Truncated {
                magic: "i3dm",
                declared: HEADER_BYTE_LENGTH,
                actual: data.len(),
            });
        }
        let mut header = Cursor::new(&data[4..HEADER_BYTE_LENGTH]);
        let version = header.read_u32::<LittleEndian>()?;
        if version != I3DM_VERSION {
            return Err(Error::UnsupportedVersion {
                magic: "i3dm",
                version,
            });
        }
        let byte_length = header.read_u32::<LittleEndian>()? as usize;
        if byte_length > data.len() {
            return Err(Error::Truncated {
                magic: "i3dm",
                declared: byte_length,
                actual: data.len(),
            });
        }
        let feature_table_json_byte_length = header.read_u32::<LittleEndian>()? as usize;
        let feature_table_binary_byte_length = header.read_u32::<LittleEndian>()? as usize;
        let batch_table_json_byte_length = header.read_u32::<LittleEndian>()? as usize;
        let batch_table_binary_byte_length = header.read_u32::<LittleEndian>()? as usize;
        let gltf_format = header.read_u32::<LittleEndian>()?;

        let mut offset = HEADER_BYTE_LENGTH;
        let feature_table_json =
            parse_json_chunk(slice_chunk("i3dm", data, &mut offset, feature_table_json_byte_length)?)?
                .unwrap_or(Value::Null);
        let feature_table_binary =
            slice_chunk("i3dm", data, &mut offset, feature_table_binary_byte_length)?.to_vec();
        let batch_table_json =
            parse_json_chunk(slice_chunk("i3dm", data, &mut offset, batch_table_json_byte_length)?)?;
        let batch_table_binary =
            slice_chunk("i3dm", data, &mut offset, batch_table_binary_byte_length)?.to_vec();
        let payload_byte_length = byte_length.checked_sub(offset).ok_or(Error::Truncated {
            magic: "i3dm",
            declared: offset,
            actual: byte_length,
        })?;
        let payload = slice_chunk("i3dm", data, &mut offset, payload_byte_length)?;

        let payload = match gltf_format {
            0 => {
                let uri = String::from_utf8(payload.to_vec())?;
                GltfPayload::Uri(uri.trim_end_matches(|c| c == '\0' || c == ' ').to_string())
            }
            _ => GltfPayload::Binary(payload.to_vec()),
        };
        return Ok(Self {
            feature_table_json,
            feature_table_binary,
            batch_table_json,
            batch_table_binary,
            payload,
        });
    }
}
