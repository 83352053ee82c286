use serde_json::Value;

use crate::Result;

const BOUNDARY: usize = 8;

/// Returns `buffer` followed by as many zero bytes as needed for the next
/// chunk to start on an 8-byte boundary, given that `buffer` itself begins
/// `byte_offset` bytes into the file. An empty buffer stays empty.
pub fn pad_buffer(buffer: &[u8], byte_offset: usize) -> Vec<u8> {
    if buffer.is_empty() {
        return Vec::new();
    }
    let remainder = (byte_offset + buffer.len()) % BOUNDARY;
    let padding = (BOUNDARY - remainder) % BOUNDARY;
    let mut padded = Vec::with_capacity(buffer.len() + padding);
    padded.extend_from_slice(buffer);
    padded.resize(buffer.len() + padding, 0);
    return padded;
}

/// Serializes `json` to its compact text form and pads it with ASCII spaces
/// up to the next 8-byte boundary, so the chunk stays valid JSON with
/// trailing whitespace. `None` yields an empty buffer.
pub fn pad_json_buffer(json: Option<&Value>, byte_offset: usize) -> Result<Vec<u8>> {
    let json = match json {
        Some(json) => json,
        None => return Ok(Vec::new()),
    };
    let mut buffer = serde_json::to_vec(json)?;
    let remainder = (byte_offset + buffer.len()) % BOUNDARY;
    let padding = (BOUNDARY - remainder) % BOUNDARY;
    buffer.resize(buffer.len() + padding, b' ');
    return Ok(buffer);
}
