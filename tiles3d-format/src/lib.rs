//https://github.com/CesiumGS/3d-tiles/tree/main/specification/TileFormats
//
//Encoders and decoders for the chunked tile container formats of 3D Tiles:
//Batched 3D Model (b3dm), Instanced 3D Model (i3dm), Point Cloud (pnts) and
//Composite (cmpt). All header fields are little-endian and every metadata
//chunk is padded to an 8-byte boundary.

mod b3dm;
mod chunk;
mod cmpt;
mod error;
mod i3dm;
mod padding;
mod pnts;

pub use b3dm::{B3dm, B3dmEncodeOptions};
pub use cmpt::Cmpt;
pub use error::Error;
pub use i3dm::{GltfPayload, I3dm};
pub use padding::{pad_buffer, pad_json_buffer};
pub use pnts::Pnts;

pub type Result<T> = std::result::Result<T, Error>;
