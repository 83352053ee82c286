use std::collections::{HashMap, VecDeque};

use crate::morton;
use crate::scheme::SubdivisionScheme;
use crate::{ImplicitTilingError, RangeError};

/// Coordinates of one node in an implicit tree. Valid coordinates keep
/// every axis below `2^level`. Values are never mutated in place; parent,
/// children and globalization all derive new coordinates.
pub trait TreeCoordinates: Sized + Clone {
    fn scheme() -> SubdivisionScheme;

    /// Level 0, all axes 0.
    fn root() -> Self;

    fn level(&self) -> u32;

    /// `None` at the root, otherwise the node one level up with each axis
    /// shifted right by one.
    fn parent(&self) -> Option<Self>;

    /// The 4 (quadtree) or 8 (octree) children at `level + 1`, in Morton
    /// order: x varies fastest, then y, then z. Child `i` of a node with
    /// in-level index `m` has in-level index `m * branching_factor + i`,
    /// which is also the bit order of child-subtree availability.
    fn children(&self) -> Vec<Self>;

    /// The Morton index of this node within its own level.
    fn to_index_in_level(&self) -> Result<u64, RangeError>;

    /// Treats `self` as the root position of a subtree in the global tree
    /// and lifts subtree-local coordinates into the global frame:
    /// `global_axis = (root_axis << local_level) + local_axis`.
    fn globalize(&self, local: &Self) -> Result<Self, RangeError>;

    /// Placeholder values for template URIs: level, x, y and (octree) z.
    fn template_values(&self) -> HashMap<&'static str, String>;

    /// A single integer addressing this node within a tree stored level by
    /// level: all nodes of earlier levels come first, then the Morton index
    /// inside this level. This is the availability bit index.
    fn to_index(&self) -> Result<u64, RangeError> {
        let nodes_before = Self::scheme().number_of_nodes_for_levels(self.level());
        return Ok(nodes_before + self.to_index_in_level()?);
    }

    /// Lazily walks this node and its descendants down to `max_level`
    /// inclusive. Breadth-first by default, depth-first on request. The
    /// iterator is single-pass; it owns its queue and cannot be restarted.
    fn descendants(&self, max_level: u32, depth_first: bool) -> Descendants<Self> {
        return Descendants {
            pending: VecDeque::from([self.clone()]),
            max_level,
            depth_first,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuadtreeCoordinates {
    pub level: u32,
    pub x: u32,
    pub y: u32,
}

impl QuadtreeCoordinates {
    pub fn new(level: u32, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }
}

impl TreeCoordinates for QuadtreeCoordinates {
    fn scheme() -> SubdivisionScheme {
        SubdivisionScheme::Quadtree
    }

    fn root() -> Self {
        Self::new(0, 0, 0)
    }

    fn level(&self) -> u32 {
        self.level
    }

    fn parent(&self) -> Option<Self> {
        if self.level == 0 {
            return None;
        }
        return Some(Self::new(self.level - 1, self.x >> 1, self.y >> 1));
    }

    fn children(&self) -> Vec<Self> {
        let level = self.level + 1;
        let x = self.x << 1;
        let y = self.y << 1;
        return vec![
            Self::new(level, x, y),
            Self::new(level, x + 1, y),
            Self::new(level, x, y + 1),
            Self::new(level, x + 1, y + 1),
        ];
    }

    fn to_index_in_level(&self) -> Result<u64, RangeError> {
        return Ok(morton::encode_2d(self.x, self.y)? as u64);
    }

    fn globalize(&self, local: &Self) -> Result<Self, RangeError> {
        let overflow = || RangeError::Overflow {
            root_level: self.level,
            local_level: local.level,
        };
        let level = self.level.checked_add(local.level).ok_or_else(overflow)?;
        let x = globalize_axis(self.x, local.x, local.level).ok_or_else(overflow)?;
        let y = globalize_axis(self.y, local.y, local.level).ok_or_else(overflow)?;
        return Ok(Self::new(level, x, y));
    }

    fn template_values(&self) -> HashMap<&'static str, String> {
        let mut values = HashMap::new();
        values.insert("level", self.level.to_string());
        values.insert("x", self.x.to_string());
        values.insert("y", self.y.to_string());
        return values;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OctreeCoordinates {
    pub level: u32,
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl OctreeCoordinates {
    pub fn new(level: u32, x: u32, y: u32, z: u32) -> Self {
        Self { level, x, y, z }
    }
}

impl TreeCoordinates for OctreeCoordinates {
    fn scheme() -> SubdivisionScheme {
        SubdivisionScheme::Octree
    }

    fn root() -> Self {
        Self::new(0, 0, 0, 0)
    }

    fn level(&self) -> u32 {
        self.level
    }

    fn parent(&self) -> Option<Self> {
        if self.level == 0 {
            return None;
        }
        return Some(Self::new(
            self.level - 1,
            self.x >> 1,
            self.y >> 1,
            self.z >> 1,
        ));
    }

    fn children(&self) -> Vec<Self> {
        let level = self.level + 1;
        let x = self.x << 1;
        let y = self.y << 1;
        let z = self.z << 1;
        return vec![
            Self::new(level, x, y, z),
            Self::new(level, x + 1, y, z),
            Self::new(level, x, y + 1, z),
            Self::new(level, x + 1, y + 1, z),
            Self::new(level, x, y, z + 1),
            Self::new(level, x + 1, y, z + 1),
            Self::new(level, x, y + 1, z + 1),
            Self::new(level, x + 1, y + 1, z + 1),
        ];
    }

    fn to_index_in_level(&self) -> Result<u64, RangeError> {
        return Ok(morton::encode_3d(self.x, self.y, self.z)? as u64);
    }

    fn globalize(&self, local: &Self) -> Result<Self, RangeError> {
        let overflow = || RangeError::Overflow {
            root_level: self.level,
            local_level: local.level,
        };
        let level = self.level.checked_add(local.level).ok_or_else(overflow)?;
        let x = globalize_axis(self.x, local.x, local.level).ok_or_else(overflow)?;
        let y = globalize_axis(self.y, local.y, local.level).ok_or_else(overflow)?;
        let z = globalize_axis(self.z, local.z, local.level).ok_or_else(overflow)?;
        return Ok(Self::new(level, x, y, z));
    }

    fn template_values(&self) -> HashMap<&'static str, String> {
        let mut values = HashMap::new();
        values.insert("level", self.level.to_string());
        values.insert("x", self.x.to_string());
        values.insert("y", self.y.to_string());
        values.insert("z", self.z.to_string());
        return values;
    }
}

fn globalize_axis(root: u32, local: u32, local_level: u32) -> Option<u32> {
    let shifted = (root as u64).checked_shl(local_level)?;
    let combined = shifted.checked_add(local as u64)?;
    return u32::try_from(combined).ok();
}

/// Runtime-schemed coordinates, for the paths where JSON decides between
/// quadtree and octree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileCoordinates {
    Quadtree(QuadtreeCoordinates),
    Octree(OctreeCoordinates),
}

impl TileCoordinates {
    pub fn scheme(&self) -> SubdivisionScheme {
        match self {
            Self::Quadtree(_) => SubdivisionScheme::Quadtree,
            Self::Octree(_) => SubdivisionScheme::Octree,
        }
    }

    pub fn level(&self) -> u32 {
        match self {
            Self::Quadtree(c) => c.level,
            Self::Octree(c) => c.level,
        }
    }

    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Quadtree(c) => c.parent().map(Self::Quadtree),
            Self::Octree(c) => c.parent().map(Self::Octree),
        }
    }

    pub fn children(&self) -> Vec<Self> {
        match self {
            Self::Quadtree(c) => c.children().into_iter().map(Self::Quadtree).collect(),
            Self::Octree(c) => c.children().into_iter().map(Self::Octree).collect(),
        }
    }

    pub fn to_index_in_level(&self) -> Result<u64, RangeError> {
        match self {
            Self::Quadtree(c) => c.to_index_in_level(),
            Self::Octree(c) => c.to_index_in_level(),
        }
    }

    pub fn to_index(&self) -> Result<u64, RangeError> {
        match self {
            Self::Quadtree(c) => c.to_index(),
            Self::Octree(c) => c.to_index(),
        }
    }

    pub fn globalize(&self, local: &Self) -> Result<Self, ImplicitTilingError> {
        match (self, local) {
            (Self::Quadtree(root), Self::Quadtree(local)) => {
                Ok(Self::Quadtree(root.globalize(local)?))
            }
            (Self::Octree(root), Self::Octree(local)) => Ok(Self::Octree(root.globalize(local)?)),
            _ => Err(ImplicitTilingError::SchemeMismatch),
        }
    }

    pub fn template_values(&self) -> HashMap<&'static str, String> {
        match self {
            Self::Quadtree(c) => c.template_values(),
            Self::Octree(c) => c.template_values(),
        }
    }
}

impl From<QuadtreeCoordinates> for TileCoordinates {
    fn from(coordinates: QuadtreeCoordinates) -> Self {
        Self::Quadtree(coordinates)
    }
}

impl From<OctreeCoordinates> for TileCoordinates {
    fn from(coordinates: OctreeCoordinates) -> Self {
        Self::Octree(coordinates)
    }
}

/// Single-pass iterator over a node and its descendants, expanding through
/// `children()` while below the level bound.
pub struct Descendants<C: TreeCoordinates> {
    pending: VecDeque<C>,
    max_level: u32,
    depth_first: bool,
}

impl<C: TreeCoordinates> Iterator for Descendants<C> {
    type Item = C;

    fn next(&mut self) -> Option<C> {
        let current = if self.depth_first {
            self.pending.pop_back()
        } else {
            self.pending.pop_front()
        }?;
        if current.level() < self.max_level {
            self.pending.extend(current.children());
        }
        return Some(current);
    }
}
