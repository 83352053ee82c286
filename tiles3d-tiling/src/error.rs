/// Structural errors: malformed subdivision schemes, subtree files or
/// buffer layouts. Always fatal to the operation that hit them; nothing is
/// recovered or retried here.
#[derive(thiserror::Error, Debug)]
pub enum ImplicitTilingError {
    #[error("invalid subdivision scheme {0:?}, expected QUADTREE or OCTREE")]
    InvalidScheme(String),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Format(#[from] tiles3d_format::Error),
    #[error("expected subtree magic \"subt\", found {0:?}")]
    InvalidMagic([u8; 4]),
    #[error("unsupported subtree version {0}")]
    UnsupportedVersion(u32),
    #[error("subtree declares {declared} bytes but only {actual} are present")]
    Truncated { declared: usize, actual: usize },
    #[error("buffer {index} has no uri and there is no binary chunk to serve it")]
    MissingBinaryChunk { index: usize },
    #[error("buffer {index} declares {declared} bytes but its source holds {actual}")]
    BufferTooShort {
        index: usize,
        declared: usize,
        actual: usize,
    },
    #[error("could not resolve buffer uri {uri:?}")]
    UnresolvedBuffer { uri: String },
    #[error("buffer view {index} does not refer to a buffer")]
    MissingBuffer { index: usize },
    #[error("buffer view {index} reaches outside buffer {buffer}")]
    BufferViewOutOfBounds { index: usize, buffer: usize },
    #[error("availability references bitstream {index} but only {count} buffer views exist")]
    MissingBitstream { index: usize, count: usize },
    #[error("bitstream of {actual} bytes cannot hold {length} availability bits")]
    BitstreamTooShort { length: u64, actual: usize },
    #[error("availability declares neither a constant nor a bitstream")]
    InvalidAvailability,
    #[error("cannot globalize coordinates: subdivision schemes differ")]
    SchemeMismatch,
    #[error("{0}")]
    Range(#[from] RangeError),
}

/// Range errors mark a caller bug, not a data-quality problem: indices and
/// coordinates must be derived from valid tree coordinates before use.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RangeError {
    #[error("morton input {value} does not fit in {bits} bits")]
    MortonInput { value: u32, bits: u32 },
    #[error("index {index} is out of range [0, {length})")]
    Index { index: u64, length: u64 },
    #[error("coordinate overflow combining root level {root_level} with local level {local_level}")]
    Overflow { root_level: u32, local_level: u32 },
}
