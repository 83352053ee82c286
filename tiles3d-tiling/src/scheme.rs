use std::fmt;
use std::str::FromStr;

use new_string_template::template::Template;
use serde::{Deserialize, Serialize};

use crate::coordinates::{OctreeCoordinates, QuadtreeCoordinates, TileCoordinates};
use crate::ImplicitTilingError;

/// How an implicit tileset subdivides: four children per node over two
/// axes, or eight over three. Carried as the `"QUADTREE"`/`"OCTREE"` tag of
/// the tileset JSON; any other tag fails to parse, so downstream arithmetic
/// never sees an unknown scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubdivisionScheme {
    Quadtree,
    Octree,
}

impl SubdivisionScheme {
    pub fn branching_factor(self) -> u64 {
        match self {
            Self::Quadtree => 4,
            Self::Octree => 8,
        }
    }

    fn dimensions(self) -> u32 {
        match self {
            Self::Quadtree => 2,
            Self::Octree => 3,
        }
    }

    /// Total node count of a complete tree with `levels` levels (levels
    /// 0 through `levels - 1`), the geometric series
    /// `(branching_factor^levels - 1) / (branching_factor - 1)`.
    pub fn number_of_nodes_for_levels(self, levels: u32) -> u64 {
        let branching_factor = self.branching_factor();
        return (branching_factor.pow(levels) - 1) / (branching_factor - 1);
    }

    /// Node count within a single level: `(2^level)^2` for quadtrees,
    /// `(2^level)^3` for octrees.
    pub fn number_of_nodes_in_level(self, level: u32) -> u64 {
        return 1u64 << (level * self.dimensions());
    }

    pub fn root_coordinates(self) -> TileCoordinates {
        match self {
            Self::Quadtree => TileCoordinates::Quadtree(QuadtreeCoordinates::new(0, 0, 0)),
            Self::Octree => TileCoordinates::Octree(OctreeCoordinates::new(0, 0, 0, 0)),
        }
    }
}

impl FromStr for SubdivisionScheme {
    type Err = ImplicitTilingError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "QUADTREE" => Ok(Self::Quadtree),
            "OCTREE" => Ok(Self::Octree),
            other => Err(ImplicitTilingError::InvalidScheme(other.to_string())),
        }
    }
}

impl fmt::Display for SubdivisionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quadtree => write!(f, "QUADTREE"),
            Self::Octree => write!(f, "OCTREE"),
        }
    }
}

/// The `implicitTiling` object of a tileset JSON: everything a traversal
/// needs to address subtrees and their tiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplicitTiling {
    pub subdivision_scheme: SubdivisionScheme,
    pub subtree_levels: u32,
    pub available_levels: u32,
    pub subtrees: SubtreeUri,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtreeUri {
    pub uri: String,
}

/// Replaces `{level}`, `{x}`, `{y}` and (octree) `{z}` with the decimal
/// coordinate values. Placeholders the coordinates do not provide are left
/// untouched.
pub fn substitute_template_uri(template: &str, coordinates: &TileCoordinates) -> String {
    let template = Template::new(template);
    return template.render_nofail(&coordinates.template_values());
}
