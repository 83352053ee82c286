//https://github.com/CesiumGS/3d-tiles/blob/main/specification/TileFormats/Batched3DModel/README.adoc

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde_json::{json, Value};
use std::io::Cursor;

use crate::chunk::{check_magic, parse_json_chunk, slice_chunk, write_metadata_chunks};
use crate::{Error, Result};

pub const B3DM_MAGIC: &[u8; 4] = b"b3dm";
pub const B3DM_VERSION: u32 = 1;

const HEADER_BYTE_LENGTH: usize = 28;
const LEGACY_1_HEADER_BYTE_LENGTH: usize = 20;
const LEGACY_2_HEADER_BYTE_LENGTH: usize = 24;

// Legacy headers are shorter, so in a legacy file the u32 read at the
// position of a current batch-table length field is really the first bytes
// of JSON text or the glTF magic. Both decode to at least this value.
const LEGACY_LENGTH_SENTINEL: u32 = 570425344;

/// A Batched 3D Model tile: a glTF payload batched with per-feature
/// metadata. The four metadata chunks precede the payload in fixed order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct B3dm {
    pub feature_table_json: Option<Value>,
    pub feature_table_binary: Vec<u8>,
    pub batch_table_json: Option<Value>,
    pub batch_table_binary: Vec<u8>,
    pub gltf: Vec<u8>,
}

/// The two deprecated header layouts are mutually exclusive.
#[derive(Debug, Clone, Copy, Default)]
pub struct B3dmEncodeOptions {
    /// 20-byte header carrying batchLength and batchTableByteLength.
    pub legacy_header_1: bool,
    /// 24-byte header carrying the batch table lengths and batchLength.
    pub legacy_header_2: bool,
}

impl B3dm {
    pub fn from_gltf(gltf: Vec<u8>) -> Self {
        Self {
            gltf,
            ..Default::default()
        }
    }

    fn batch_length(&self) -> u32 {
        return self
            .feature_table_json
            .as_ref()
            .and_then(|json| json.get("BATCH_LENGTH"))
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        return self.encode_with_options(B3dmEncodeOptions::default());
    }

    pub fn encode_with_options(&self, options: B3dmEncodeOptions) -> Result<Vec<u8>> {
        if options.legacy_header_1 && options.legacy_header_2 {
            return Err(Error::ConflictingLegacyHeaders);
        }
        if options.legacy_header_1 {
            return self.encode_legacy_1();
        }
        if options.legacy_header_2 {
            return self.encode_legacy_2();
        }

        let default_feature_table;
        let feature_table_json = match &self.feature_table_json {
            Some(json) => json,
            None => {
                default_feature_table = json!({ "BATCH_LENGTH": 0 });
                &default_feature_table
            }
        };
        let chunks = write_metadata_chunks(
            HEADER_BYTE_LENGTH,
            Some(feature_table_json),
            &self.feature_table_binary,
            self.batch_table_json.as_ref(),
            &self.batch_table_binary,
        )?;

        let byte_length = HEADER_BYTE_LENGTH + chunks.bytes.len() + self.gltf.len();
        let mut tile = Vec::with_capacity(byte_length);
        tile.extend_from_slice(B3DM_MAGIC);
        tile.write_u32::<LittleEndian>(B3DM_VERSION)?;
        tile.write_u32::<LittleEndian>(byte_length as u32)?;
        tile.write_u32::<LittleEndian>(chunks.feature_table_json_byte_length)?;
        tile.write_u32::<LittleEndian>(chunks.feature_table_binary_byte_length)?;
        tile.write_u32::<LittleEndian>(chunks.batch_table_json_byte_length)?;
        tile.write_u32::<LittleEndian>(chunks.batch_table_binary_byte_length)?;
        tile.extend_from_slice(&chunks.bytes);
        tile.extend_from_slice(&self.gltf);
        return Ok(tile);
    }

    // header: magic, version, byteLength, batchLength, batchTableByteLength
    // body: batch table JSON, glTF. The layout predates feature tables and
    // batch table binaries.
    fn encode_legacy_1(&self) -> Result<Vec<u8>> {
        let batch_table_json = crate::pad_json_buffer(
            self.batch_table_json.as_ref(),
            LEGACY_1_HEADER_BYTE_LENGTH,
        )?;
        let byte_length = LEGACY_1_HEADER_BYTE_LENGTH + batch_table_json.len() + self.gltf.len();
        let mut tile = Vec::with_capacity(byte_length);
        tile.extend_from_slice(B3DM_MAGIC);
        tile.write_u32::<LittleEndian>(B3DM_VERSION)?;
        tile.write_u32::<LittleEndian>(byte_length as u32)?;
        tile.write_u32::<LittleEndian>(self.batch_length())?;
        tile.write_u32::<LittleEndian>(batch_table_json.len() as u32)?;
        tile.extend_from_slice(&batch_table_json);
        tile.extend_from_slice(&self.gltf);
        return Ok(tile);
    }

    // header: magic, version, byteLength, batchTableJsonByteLength,
    // batchTableBinaryByteLength, batchLength
    fn encode_legacy_2(&self) -> Result<Vec<u8>> {
        let batch_table_json = crate::pad_json_buffer(
            self.batch_table_json.as_ref(),
            LEGACY_2_HEADER_BYTE_LENGTH,
        )?;
        let batch_table_binary = crate::pad_buffer(
            &self.batch_table_binary,
            LEGACY_2_HEADER_BYTE_LENGTH + batch_table_json.len(),
        );
        let byte_length = LEGACY_2_HEADER_BYTE_LENGTH
            + batch_table_json.len()
            + batch_table_binary.len()
            + self.gltf.len();
        let mut tile = Vec::with_capacity(byte_length);
        tile.extend_from_slice(B3DM_MAGIC);
        tile.write_u32::<LittleEndian>(B3DM_VERSION)?;
        tile.write_u32::<LittleEndian>(byte_length as u32)?;
        tile.write_u32::<LittleEndian>(batch_table_json.len() as u32)?;
        tile.write_u32::<LittleEndian>(batch_table_binary.len() as u32)?;
        tile.write_u32::<LittleEndian>(self.batch_length())?;
        tile.extend_from_slice(&batch_table_json);
        tile.extend_from_slice(&batch_table_binary);
        tile.extend_from_slice(&self.gltf);
        return Ok(tile);
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        check_magic(B3DM_MAGIC, data)?;
        if data.len() < HEADER_BYTE_LENGTH {
            return Err(Error::Truncated {
                magic: "b3dm",
                declared: HEADER_BYTE_LENGTH,
                actual: data.len(),
            });
        }
        let mut header = Cursor::new(&data[4..HEADER_BYTE_LENGTH]);
        let version = header.read_u32::<LittleEndian>()?;
        if version != B3DM_VERSION {
            return Err(Error::UnsupportedVersion {
                magic: "b3dm",
                version,
            });
        }
        let byte_length = header.read_u32::<LittleEndian>()? as usize;
        if byte_length > data.len() {
            return Err(Error::Truncated {
                magic: "b3dm",
                declared: byte_length,
                actual: data.len(),
            });
        }
        let mut feature_table_json_byte_length = header.read_u32::<LittleEndian>()? as usize;
        let mut feature_table_binary_byte_length = header.read_u32::<LittleEndian>()? as usize;
        let mut batch_table_json_byte_length = header.read_u32::<LittleEndian>()? as usize;
        let mut batch_table_binary_byte_length = header.read_u32::<LittleEndian>()? as usize;

        let mut header_byte_length = HEADER_BYTE_LENGTH;
        let mut legacy_batch_length = None;
        if batch_table_json_byte_length as u32 >= LEGACY_LENGTH_SENTINEL {
            legacy_batch_length = Some(feature_table_json_byte_length as u32);
            batch_table_json_byte_length = feature_table_binary_byte_length;
            batch_table_binary_byte_length = 0;
            feature_table_json_byte_length = 0;
            feature_table_binary_byte_length = 0;
            header_byte_length = LEGACY_1_HEADER_BYTE_LENGTH;
        } else if batch_table_binary_byte_length as u32 >= LEGACY_LENGTH_SENTINEL {
            legacy_batch_length = Some(batch_table_json_byte_length as u32);
            batch_table_json_byte_length = feature_table_json_byte_length;
            batch_table_binary_byte_length = feature_table_binary_byte_length;
            feature_table_json_byte_length = 0;
            feature_table_binary_byte_length = 0;
            header_byte_length = LEGACY_2_HEADER_BYTE_LENGTH;
        }

        let mut offset = header_byte_length;
        let feature_table_json =
            parse_json_chunk(slice_chunk("b3dm", data, &mut offset, feature_table_json_byte_length)?)?;
        let feature_table_binary =
            slice_chunk("b3dm", data, &mut offset, feature_table_binary_byte_length)?.to_vec();
        let batch_table_json =
            parse_json_chunk(slice_chunk("b3dm", data, &mut offset, batch_table_json_byte_length)?)?;
        let batch_table_binary =
            slice_chunk("b3dm", data, &mut offset, batch_table_binary_byte_length)?.to_vec();
        let gltf_byte_length = byte_length.checked_sub(offset).ok_or(Error::Truncated {
            magic: "b3dm",
            declared: offset,
            actual: byte_length,
        })?;
        let gltf = slice_chunk("b3dm", data, &mut offset, gltf_byte_length)?.to_vec();

        let feature_table_json = match legacy_batch_length {
            Some(batch_length) => Some(json!({ "BATCH_LENGTH": batch_length })),
            None => feature_table_json,
        };
        return Ok(Self {
            feature_table_json,
            feature_table_binary,
            batch_table_json,
            batch_table_binary,
            gltf,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ByteOrder;

    fn fake_glb() -> Vec<u8> {
        let mut glb = b"glTF".to_vec();
        glb.extend_from_slice(&[2, 0, 0, 0, 20, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8]);
        glb
    }

    #[test]
    fn round_trip_preserves_feature_table_and_payload() {
        let tile = B3dm {
            feature_table_json: Some(json!({ "BATCH_LENGTH": 3 })),
            gltf: fake_glb(),
            ..Default::default()
        };
        let encoded = tile.encode().unwrap();
        assert_eq!(
            LittleEndian::read_u32(&encoded[8..12]) as usize,
            encoded.len()
        );
        let decoded = B3dm::decode(&encoded).unwrap();
        assert_eq!(decoded.feature_table_json, Some(json!({ "BATCH_LENGTH": 3 })));
        assert_eq!(decoded.gltf, tile.gltf);
        assert!(decoded.batch_table_json.is_none());
    }

    #[test]
    fn omitted_feature_table_defaults_to_zero_batch_length() {
        let encoded = B3dm::from_gltf(fake_glb()).encode().unwrap();
        let decoded = B3dm::decode(&encoded).unwrap();
        assert_eq!(decoded.feature_table_json, Some(json!({ "BATCH_LENGTH": 0 })));
    }

    #[test]
    fn binary_chunks_start_on_eight_byte_boundaries() {
        let tile = B3dm {
            feature_table_json: Some(json!({ "BATCH_LENGTH": 2 })),
            feature_table_binary: vec![1, 2, 3],
            batch_table_json: Some(json!({ "height": [10, 20] })),
            batch_table_binary: vec![4, 5],
            gltf: fake_glb(),
        };
        let encoded = tile.encode().unwrap();
        let ft_json = LittleEndian::read_u32(&encoded[12..16]) as usize;
        let ft_bin = LittleEndian::read_u32(&encoded[16..20]) as usize;
        let bt_json = LittleEndian::read_u32(&encoded[20..24]) as usize;
        assert_eq!((28 + ft_json) % 8, 0);
        assert_eq!((28 + ft_json + ft_bin) % 8, 0);
        assert_eq!((28 + ft_json + ft_bin + bt_json) % 8, 0);
    }

    #[test]
    fn requesting_both_legacy_headers_is_rejected() {
        let result = B3dm::from_gltf(fake_glb()).encode_with_options(B3dmEncodeOptions {
            legacy_header_1: true,
            legacy_header_2: true,
        });
        assert!(matches!(result, Err(Error::ConflictingLegacyHeaders)));
    }

    #[test]
    fn legacy_20_byte_header_is_recognized() {
        let tile = B3dm {
            feature_table_json: Some(json!({ "BATCH_LENGTH": 3 })),
            batch_table_json: Some(json!({ "height": [1, 2, 3] })),
            gltf: fake_glb(),
            ..Default::default()
        };
        let encoded = tile
            .encode_with_options(B3dmEncodeOptions {
                legacy_header_1: true,
                ..Default::default()
            })
            .unwrap();
        let decoded = B3dm::decode(&encoded).unwrap();
        assert_eq!(decoded.feature_table_json, Some(json!({ "BATCH_LENGTH": 3 })));
        assert_eq!(decoded.batch_table_json, Some(json!({ "height": [1, 2, 3] })));
        assert_eq!(decoded.gltf, tile.gltf);
    }

    #[test]
    fn legacy_24_byte_header_is_recognized() {
        let tile = B3dm {
            feature_table_json: Some(json!({ "BATCH_LENGTH": 2 })),
            batch_table_json: Some(json!({ "id": [7, 9] })),
            batch_table_binary: vec![1, 2, 3, 4],
            gltf: fake_glb(),
            ..Default::default()
        };
        let encoded = tile
            .encode_with_options(B3dmEncodeOptions {
                legacy_header_2: true,
                ..Default::default()
            })
            .unwrap();
        let decoded = B3dm::decode(&encoded).unwrap();
        assert_eq!(decoded.feature_table_json, Some(json!({ "BATCH_LENGTH": 2 })));
        assert_eq!(decoded.batch_table_json, Some(json!({ "id": [7, 9] })));
        assert_eq!(decoded.gltf, tile.gltf);
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let result = B3dm::decode(b"i3dm\x01\x00\x00\x00");
        assert!(matches!(result, Err(Error::InvalidMagic { .. })));
    }

    #[test]
    fn declared_length_beyond_input_is_rejected() {
        let mut encoded = B3dm::from_gltf(fake_glb()).encode().unwrap();
        encoded.truncate(encoded.len() - 4);
        assert!(matches!(
            B3dm::decode(&encoded),
            Err(Error::Truncated { .. })
        ));
    }
}
