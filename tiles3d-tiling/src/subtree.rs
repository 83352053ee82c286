//https://github.com/CesiumGS/3d-tiles/tree/main/specification/ImplicitTiling#subtrees

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use tiles3d_format::{pad_buffer, pad_json_buffer};

use crate::availability::{Availability, AvailabilityInfo};
use crate::resource::ResourceResolver;
use crate::scheme::ImplicitTiling;
use crate::ImplicitTilingError;

pub const SUBTREE_MAGIC: &[u8; 4] = b"subt";
pub const SUBTREE_VERSION: u32 = 1;

const HEADER_BYTE_LENGTH: usize = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtreeBuffer {
    /// Where the buffer bytes live. A buffer without a URI is served by the
    /// subtree's embedded binary chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub byte_length: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtreeBufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: u64,
    pub byte_length: u64,
}

/// The JSON chunk of a binary subtree file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtree {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<SubtreeBuffer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<SubtreeBufferView>,
    pub tile_availability: Availability,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_availability: Vec<Availability>,
    pub child_subtree_availability: Availability,
}

/// A subtree file split into its parsed JSON chunk and its raw binary
/// chunk. An absent binary chunk stays `None`; it is not the same thing as
/// an embedded empty buffer.
#[derive(Debug, Clone)]
pub struct BinarySubtreeData {
    pub subtree: Subtree,
    pub binary: Option<Bytes>,
}

impl BinarySubtreeData {
    pub fn from_bytes(data: Bytes) -> Result<Self, ImplicitTilingError> {
        if data.len() < HEADER_BYTE_LENGTH {
            return Err(ImplicitTilingError::Truncated {
                declared: HEADER_BYTE_LENGTH,
                actual: data.len(),
            });
        }
        if data[0..4] != SUBTREE_MAGIC[..] {
            return Err(ImplicitTilingError::InvalidMagic([
                data[0], data[1], data[2], data[3],
            ]));
        }
        let mut header = Cursor::new(&data[4..HEADER_BYTE_LENGTH]);
        let version = header.read_u32::<LittleEndian>()?;
        if version != SUBTREE_VERSION {
            return Err(ImplicitTilingError::UnsupportedVersion(version));
        }
        let json_byte_length = header.read_u64::<LittleEndian>()? as usize;
        let binary_byte_length = header.read_u64::<LittleEndian>()? as usize;

        let json_end = HEADER_BYTE_LENGTH + json_byte_length;
        let binary_end = json_end + binary_byte_length;
        if binary_end > data.len() {
            return Err(ImplicitTilingError::Truncated {
                declared: binary_end,
                actual: data.len(),
            });
        }
        let subtree: Subtree = serde_json::from_slice(&data[HEADER_BYTE_LENGTH..json_end])?;
        let binary = if binary_byte_length == 0 {
            None
        } else {
            Some(data.slice(json_end..binary_end))
        };
        return Ok(Self { subtree, binary });
    }

    /// Writes header, space-padded JSON chunk and zero-padded binary chunk.
    /// Both declared chunk lengths include their padding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ImplicitTilingError> {
        let json = serde_json::to_value(&self.subtree)?;
        let json_chunk = pad_json_buffer(Some(&json), HEADER_BYTE_LENGTH)?;
        let binary_chunk = match &self.binary {
            Some(binary) => pad_buffer(binary, HEADER_BYTE_LENGTH + json_chunk.len()),
            None => Vec::new(),
        };

        let mut file =
            Vec::with_capacity(HEADER_BYTE_LENGTH + json_chunk.len() + binary_chunk.len());
        file.extend_from_slice(SUBTREE_MAGIC);
        file.write_u32::<LittleEndian>(SUBTREE_VERSION)?;
        file.write_u64::<LittleEndian>(json_chunk.len() as u64)?;
        file.write_u64::<LittleEndian>(binary_chunk.len() as u64)?;
        file.extend_from_slice(&json_chunk);
        file.extend_from_slice(&binary_chunk);
        return Ok(file);
    }
}

/// The three availability queries a subtree exposes, assembled once per
/// subtree file and read-only afterwards.
#[derive(Debug, Clone)]
pub struct SubtreeInfo {
    tile_availability: AvailabilityInfo,
    content_availability: Vec<AvailabilityInfo>,
    child_subtree_availability: AvailabilityInfo,
}

impl SubtreeInfo {
    /// Builds the availability queries of one subtree. External buffers are
    /// resolved one at a time, in buffer order; any failure fails the whole
    /// operation and no partial result is handed out.
    pub async fn create(
        data: &BinarySubtreeData,
        implicit_tiling: &ImplicitTiling,
        resolver: &dyn ResourceResolver,
    ) -> Result<Self, ImplicitTilingError> {
        let buffers = resolve_buffers(data, resolver).await?;
        let buffer_views = slice_buffer_views(&data.subtree, &buffers)?;

        let scheme = implicit_tiling.subdivision_scheme;
        let node_count = scheme.number_of_nodes_for_levels(implicit_tiling.subtree_levels);
        let child_count = scheme.number_of_nodes_in_level(implicit_tiling.subtree_levels);

        let tile_availability =
            AvailabilityInfo::create(&data.subtree.tile_availability, &buffer_views, node_count)?;
        let content_availability = data
            .subtree
            .content_availability
            .iter()
            .map(|availability| AvailabilityInfo::create(availability, &buffer_views, node_count))
            .collect::<Result<Vec<_>, _>>()?;
        let child_subtree_availability = AvailabilityInfo::create(
            &data.subtree.child_subtree_availability,
            &buffer_views,
            child_count,
        )?;
        return Ok(Self {
            tile_availability,
            content_availability,
            child_subtree_availability,
        });
    }

    /// One bit per node of this subtree, in global-index order.
    pub fn tile_availability(&self) -> &AvailabilityInfo {
        &self.tile_availability
    }

    /// One entry per content stream; a tile may carry several contents.
    pub fn content_availability(&self) -> &[AvailabilityInfo] {
        &self.content_availability
    }

    /// One bit per child subtree, i.e. per node of the level just below
    /// this subtree's deepest level.
    pub fn child_subtree_availability(&self) -> &AvailabilityInfo {
        &self.child_subtree_availability
    }
}

async fn resolve_buffers(
    data: &BinarySubtreeData,
    resolver: &dyn ResourceResolver,
) -> Result<Vec<Bytes>, ImplicitTilingError> {
    let mut buffers = Vec::with_capacity(data.subtree.buffers.len());
    for (index, buffer) in data.subtree.buffers.iter().enumerate() {
        let declared = buffer.byte_length as usize;
        let source = match &buffer.uri {
            Some(uri) => resolver.resolve(uri).await.ok_or_else(|| {
                ImplicitTilingError::UnresolvedBuffer { uri: uri.clone() }
            })?,
            None => data
                .binary
                .clone()
                .ok_or(ImplicitTilingError::MissingBinaryChunk { index })?,
        };
        if source.len() < declared {
            return Err(ImplicitTilingError::BufferTooShort {
                index,
                declared,
                actual: source.len(),
            });
        }
        buffers.push(source.slice(0..declared));
    }
    return Ok(buffers);
}

fn slice_buffer_views(
    subtree: &Subtree,
    buffers: &[Bytes],
) -> Result<Vec<Bytes>, ImplicitTilingError> {
    let mut views = Vec::with_capacity(subtree.buffer_views.len());
    for (index, view) in subtree.buffer_views.iter().enumerate() {
        let buffer = buffers
            .get(view.buffer)
            .ok_or(ImplicitTilingError::MissingBuffer { index })?;
        let start = view.byte_offset as usize;
        let end = start + view.byte_length as usize;
        if end > buffer.len() {
            return Err(ImplicitTilingError::BufferViewOutOfBounds {
                index,
                buffer: view.buffer,
            });
        }
        views.push(buffer.slice(start..end));
    }
    return Ok(views);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::AsyncReturn;
    use crate::scheme::{SubdivisionScheme, SubtreeUri};
    use std::collections::HashMap;

    struct MapResolver {
        files: HashMap<String, Bytes>,
    }

    impl MapResolver {
        fn new() -> Self {
            Self {
                files: HashMap::new(),
            }
        }

        fn with(mut self, uri: &str, bytes: &'static [u8]) -> Self {
            self.files.insert(uri.to_string(), Bytes::from_static(bytes));
            self
        }
    }

    impl ResourceResolver for MapResolver {
        fn resolve(&self, uri: &str) -> AsyncReturn<Option<Bytes>> {
            let hit = self.files.get(uri).cloned();
            return Box::pin(async move { hit });
        }
    }

    fn quadtree_tiling(subtree_levels: u32) -> ImplicitTiling {
        ImplicitTiling {
            subdivision_scheme: SubdivisionScheme::Quadtree,
            subtree_levels,
            available_levels: subtree_levels * 2,
            subtrees: SubtreeUri {
                uri: "subtrees/{level}/{x}/{y}.subtree".to_string(),
            },
        }
    }

    fn embedded_subtree() -> BinarySubtreeData {
        // two levels: 5 tile bits, 16 child-subtree bits
        let subtree = Subtree {
            buffers: vec![SubtreeBuffer {
                uri: None,
                byte_length: 16,
                name: None,
            }],
            buffer_views: vec![
                SubtreeBufferView {
                    buffer: 0,
                    byte_offset: 0,
                    byte_length: 1,
                },
                SubtreeBufferView {
                    buffer: 0,
                    byte_offset: 8,
                    byte_length: 2,
                },
            ],
            tile_availability: Availability::bitstream(0),
            content_availability: vec![Availability::constant(1)],
            child_subtree_availability: Availability::bitstream(1),
        };
        let mut binary = vec![0u8; 16];
        binary[0] = 0b0001_0111;
        binary[8] = 0xab;
        binary[9] = 0xcd;
        BinarySubtreeData {
            subtree,
            binary: Some(Bytes::from(binary)),
        }
    }

    #[test]
    fn binary_round_trip() {
        let encoded = embedded_subtree().to_bytes().unwrap();
        assert_eq!(&encoded[0..4], b"subt");
        assert_eq!(encoded.len() % 8, 0);

        let decoded = BinarySubtreeData::from_bytes(Bytes::from(encoded)).unwrap();
        assert_eq!(decoded.subtree.buffers.len(), 1);
        assert_eq!(decoded.subtree.buffer_views.len(), 2);
        let binary = decoded.binary.unwrap();
        assert_eq!(binary[0], 0b0001_0111);
        assert_eq!(binary[9], 0xcd);
    }

    #[test]
    fn empty_binary_chunk_decodes_to_none() {
        let data = BinarySubtreeData {
            subtree: Subtree {
                buffers: Vec::new(),
                buffer_views: Vec::new(),
                tile_availability: Availability::constant(1),
                content_availability: Vec::new(),
                child_subtree_availability: Availability::constant(0),
            },
            binary: None,
        };
        let decoded = BinarySubtreeData::from_bytes(Bytes::from(data.to_bytes().unwrap())).unwrap();
        assert!(decoded.binary.is_none());
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let result = BinarySubtreeData::from_bytes(Bytes::from_static(
            b"nope\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00",
        ));
        assert!(matches!(result, Err(ImplicitTilingError::InvalidMagic(_))));
    }

    #[test]
    fn declared_chunks_beyond_input_are_rejected() {
        let mut encoded = embedded_subtree().to_bytes().unwrap();
        encoded.truncate(encoded.len() - 8);
        let result = BinarySubtreeData::from_bytes(Bytes::from(encoded));
        assert!(matches!(result, Err(ImplicitTilingError::Truncated { .. })));
    }

    #[tokio::test]
    async fn assembles_availability_from_the_embedded_chunk() {
        let data = embedded_subtree();
        let info = SubtreeInfo::create(&data, &quadtree_tiling(2), &MapResolver::new())
            .await
            .unwrap();

        let tiles = info.tile_availability();
        assert_eq!(tiles.length(), 5);
        assert!(tiles.is_available(0).unwrap());
        assert!(tiles.is_available(1).unwrap());
        assert!(tiles.is_available(2).unwrap());
        assert!(!tiles.is_available(3).unwrap());
        assert!(tiles.is_available(4).unwrap());

        assert_eq!(info.content_availability().len(), 1);
        assert_eq!(info.content_availability()[0].length(), 5);
        assert!(info.content_availability()[0].is_available(3).unwrap());

        let children = info.child_subtree_availability();
        assert_eq!(children.length(), 16);
        // 0xab = 0b10101011
        assert!(children.is_available(0).unwrap());
        assert!(!children.is_available(2).unwrap());
        assert!(children.is_available(8).unwrap());
    }

    #[tokio::test]
    async fn resolves_external_buffers_by_uri() {
        let subtree = Subtree {
            buffers: vec![SubtreeBuffer {
                uri: Some("bits.bin".to_string()),
                byte_length: 1,
                name: None,
            }],
            buffer_views: vec![SubtreeBufferView {
                buffer: 0,
                byte_offset: 0,
                byte_length: 1,
            }],
            tile_availability: Availability::bitstream(0),
            content_availability: Vec::new(),
            child_subtree_availability: Availability::constant(0),
        };
        let data = BinarySubtreeData {
            subtree,
            binary: None,
        };
        let resolver = MapResolver::new().with("bits.bin", &[0b0000_0001]);
        let info = SubtreeInfo::create(&data, &quadtree_tiling(1), &resolver)
            .await
            .unwrap();
        assert_eq!(info.tile_availability().length(), 1);
        assert!(info.tile_availability().is_available(0).unwrap());
        assert_eq!(info.child_subtree_availability().length(), 4);
    }

    #[tokio::test]
    async fn unresolved_buffer_uri_fails_the_whole_operation() {
        let mut data = embedded_subtree();
        data.subtree.buffers[0].uri = Some("missing.bin".to_string());
        let result = SubtreeInfo::create(&data, &quadtree_tiling(2), &MapResolver::new()).await;
        assert!(matches!(
            result,
            Err(ImplicitTilingError::UnresolvedBuffer { uri }) if uri == "missing.bin"
        ));
    }

    #[tokio::test]
    async fn buffer_without_uri_needs_the_binary_chunk() {
        let mut data = embedded_subtree();
        data.binary = None;
        let result = SubtreeInfo::create(&data, &quadtree_tiling(2), &MapResolver::new()).await;
        assert!(matches!(
            result,
            Err(ImplicitTilingError::MissingBinaryChunk { index: 0 })
        ));
    }

    #[tokio::test]
    async fn buffer_view_outside_its_buffer_is_rejected() {
        let mut data = embedded_subtree();
        data.subtree.buffer_views[1].byte_offset = 15;
        let result = SubtreeInfo::create(&data, &quadtree_tiling(2), &MapResolver::new()).await;
        assert!(matches!(
            result,
            Err(ImplicitTilingError::BufferViewOutOfBounds { index: 1, buffer: 0 })
        ));
    }
}
