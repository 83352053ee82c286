//https://github.com/CesiumGS/3d-tiles/tree/main/specification/ImplicitTiling
//
//Implicit tiling for 3D Tiles: Morton-order addressing over quadtrees and
//octrees, tree coordinates, availability queries and the binary subtree
//format that stores them.

mod availability;
mod coordinates;
mod error;
pub mod morton;
mod resource;
mod scheme;
mod subtree;

pub use availability::{Availability, AvailabilityInfo};
pub use coordinates::{
    Descendants, OctreeCoordinates, QuadtreeCoordinates, TileCoordinates, TreeCoordinates,
};
pub use error::{ImplicitTilingError, RangeError};
pub use resource::{AsyncReturn, ResourceResolver};
pub use scheme::{substitute_template_uri, ImplicitTiling, SubdivisionScheme, SubtreeUri};
pub use subtree::{BinarySubtreeData, Subtree, SubtreeBuffer, SubtreeBufferView, SubtreeInfo};
