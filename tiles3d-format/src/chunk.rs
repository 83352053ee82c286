use serde_json::Value;

use crate::padding::{pad_buffer, pad_json_buffer};
use crate::{Error, Result};

/// The four metadata chunks shared by b3dm, i3dm and pnts, already padded
/// and concatenated, together with the chunk lengths the header declares.
pub(crate) struct MetadataChunks {
    pub bytes: Vec<u8>,
    pub feature_table_json_byte_length: u32,
    pub feature_table_binary_byte_length: u32,
    pub batch_table_json_byte_length: u32,
    pub batch_table_binary_byte_length: u32,
}

pub(crate) fn write_metadata_chunks(
    header_byte_length: usize,
    feature_table_json: Option<&Value>,
    feature_table_binary: &[u8],
    batch_table_json: Option<&Value>,
    batch_table_binary: &[u8],
) -> Result<MetadataChunks> {
    let mut bytes: Vec<u8> = Vec::new();

    let chunk = pad_json_buffer(feature_table_json, header_byte_length)?;
    let feature_table_json_byte_length = chunk.len() as u32;
    bytes.extend_from_slice(&chunk);

    let chunk = pad_buffer(feature_table_binary, header_byte_length + bytes.len());
    let feature_table_binary_byte_length = chunk.len() as u32;
    bytes.extend_from_slice(&chunk);

    let chunk = pad_json_buffer(batch_table_json, header_byte_length + bytes.len())?;
    let batch_table_json_byte_length = chunk.len() as u32;
    bytes.extend_from_slice(&chunk);

    let chunk = pad_buffer(batch_table_binary, header_byte_length + bytes.len());
    let batch_table_binary_byte_length = chunk.len() as u32;
    bytes.extend_from_slice(&chunk);

    return Ok(MetadataChunks {
        bytes,
        feature_table_json_byte_length,
        feature_table_binary_byte_length,
        batch_table_json_byte_length,
        batch_table_binary_byte_length,
    });
}

/// Slices the next `length` bytes out of `data`, advancing `offset`.
/// Declared lengths are trusted, but never past the end of the input.
pub(crate) fn slice_chunk<'a>(
    magic: &'static str,
    data: &'a [u8],
    offset: &mut usize,
    length: usize,
) -> Result<&'a [u8]> {
    let end = *offset + length;
    if end > data.len() {
        return Err(Error::Truncated {
            magic,
            declared: end,
            actual: data.len(),
        });
    }
    let chunk = &data[*offset..end];
    *offset = end;
    return Ok(chunk);
}

/// An empty chunk means "no table"; trailing space padding is valid JSON
/// whitespace, so the declared chunk can be parsed as-is.
pub(crate) fn parse_json_chunk(chunk: &[u8]) -> Result<Option<Value>> {
    if chunk.is_empty() {
        return Ok(None);
    }
    return Ok(Some(serde_json::from_slice(chunk)?));
}

pub(crate) fn check_magic(expected: &[u8; 4], data: &[u8]) -> Result<()> {
    if data.len() < 4 {
        return Err(Error::Truncated {
            magic: "tile",
            declared: 4,
            actual: data.len(),
        });
    }
    let found = [data[0], data[1], data[2], data[3]];
    if &found != expected {
        return Err(Error::InvalidMagic {
            expected: *expected,
            found,
        });
    }
    return Ok(());
}
